//! Cleanup report types

use serde::{Deserialize, Serialize};

/// Result of a cleanup run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Steps that changed remote state
    pub succeeded: Vec<StepResult>,

    /// Steps that found nothing to do (already gone, already detached)
    pub skipped: Vec<StepResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl CleanupReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.succeeded.push(StepResult {
            step: step.into(),
            message: message.into(),
        });
    }

    pub fn add_skipped(&mut self, step: impl Into<String>, message: impl Into<String>) {
        self.skipped.push(StepResult {
            step: step.into(),
            message: message.into(),
        });
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: CleanupReport) {
        self.succeeded.extend(other.succeeded);
        self.skipped.extend(other.skipped);
        self.duration_ms += other.duration_ms;
    }

    /// Whether a step with the given id completed
    pub fn did(&self, step: &str) -> bool {
        self.succeeded.iter().any(|s| s.step == step)
    }

    pub fn is_noop(&self) -> bool {
        self.succeeded.is_empty()
    }
}

impl std::fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} removed, {} already gone ({} ms)",
            self.succeeded.len(),
            self.skipped.len(),
            self.duration_ms
        )
    }
}

/// Result of a single cleanup step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step id, e.g. `delete-volume-42`
    pub step: String,

    pub message: String,
}

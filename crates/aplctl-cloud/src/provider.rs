//! Cloud resource API trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource API abstraction trait
///
/// Covers exactly the operations cluster cleanup needs. Providers (Linode
/// today) implement this trait; tests use the in-memory fake.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Returns the provider name (e.g., "linode")
    fn name(&self) -> &str;

    /// List every block storage volume on the account
    async fn list_volumes(&self) -> Result<Vec<Volume>>;

    /// Replace the tag set of a volume
    async fn tag_volume(&self, volume_id: u64, tags: &[String]) -> Result<()>;

    /// Detach a volume from whatever instance holds it
    async fn detach_volume(&self, volume_id: u64) -> Result<()>;

    /// Delete a volume
    async fn delete_volume(&self, volume_id: u64) -> Result<()>;

    /// List every load balancer on the account
    async fn list_node_balancers(&self) -> Result<Vec<NodeBalancer>>;

    /// Delete a load balancer
    async fn delete_node_balancer(&self, node_balancer_id: u64) -> Result<()>;

    /// Delete a managed Kubernetes cluster
    async fn delete_cluster(&self, cluster_id: u64) -> Result<()>;
}

/// Block storage volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: u64,

    /// Volume label (usually the PVC name)
    pub label: String,

    /// Instance the volume is attached to, if any
    #[serde(default)]
    pub linode_id: Option<u64>,

    /// Label of the attached instance; cluster nodes are named `lke<id>-...`
    #[serde(default)]
    pub linode_label: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Volume {
    /// Whether the volume is attached to a node whose label contains `label`
    pub fn attached_to(&self, label: &str) -> bool {
        self.linode_label
            .as_deref()
            .is_some_and(|l| l.contains(label))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Load balancer (NodeBalancer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBalancer {
    pub id: u64,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl NodeBalancer {
    pub fn label_contains(&self, label: &str) -> bool {
        self.label.as_deref().is_some_and(|l| l.contains(label))
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first request
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Retry `count` times, never waiting longer than `max_delay`
    pub fn bounded(count: u32, max_delay: Duration) -> Self {
        Self {
            max_attempts: count,
            max_delay,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

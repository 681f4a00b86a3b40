//! In-memory engine and lookup for tests
//!
//! Calls are recorded as `op:fqsn` (config calls as `op:fqsn:key`) so tests
//! can assert ordering across stacks.

use crate::engine::{DestroyOptions, Outputs, ProvisioningEngine, Result, StackHandle, UpOptions};
use crate::error::EngineError;
use crate::lookup::StackLookup;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    calls: Vec<String>,
    config: HashMap<String, BTreeMap<String, String>>,
    outputs: HashMap<String, Outputs>,
    failures: HashSet<String>,
}

fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn record(state: &Mutex<State>, call: String) -> Result<std::sync::MutexGuard<'_, State>> {
    let mut guard = lock(state);
    guard.calls.push(call.clone());
    if guard.failures.contains(&call) {
        return Err(EngineError::CommandFailed {
            command: call,
            message: "injected failure".to_string(),
        });
    }
    Ok(guard)
}

#[derive(Default, Clone)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the exact call (e.g. `up:acme/demo-apl/dev`) fail
    pub fn fail_on(self, call: impl Into<String>) -> Self {
        lock(&self.state).failures.insert(call.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    pub fn set_stack_config(&self, fqsn: &str, key: &str, value: &str) {
        lock(&self.state)
            .config
            .entry(fqsn.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn stack_config(&self, fqsn: &str, key: &str) -> Option<String> {
        lock(&self.state)
            .config
            .get(fqsn)
            .and_then(|c| c.get(key))
            .cloned()
    }

    /// Outputs returned by `up` and `outputs` for `fqsn`
    pub fn set_outputs(&self, fqsn: &str, outputs: impl IntoIterator<Item = (String, Value)>) {
        lock(&self.state)
            .outputs
            .insert(fqsn.to_string(), outputs.into_iter().collect());
    }
}

#[async_trait]
impl ProvisioningEngine for FakeEngine {
    async fn upsert(&self, fqsn: &str, _path: &Path) -> Result<Box<dyn StackHandle>> {
        drop(record(&self.state, format!("upsert:{}", fqsn))?);
        Ok(Box::new(FakeStack {
            state: self.state.clone(),
            fqsn: fqsn.to_string(),
        }))
    }

    async fn remove_stack(&self, fqsn: &str, _path: &Path, _force: bool) -> Result<()> {
        let mut state = record(&self.state, format!("remove_stack:{}", fqsn))?;
        state.config.remove(fqsn);
        state.outputs.remove(fqsn);
        Ok(())
    }
}

struct FakeStack {
    state: Arc<Mutex<State>>,
    fqsn: String,
}

#[async_trait]
impl StackHandle for FakeStack {
    fn fqsn(&self) -> &str {
        &self.fqsn
    }

    async fn refresh(&self) -> Result<()> {
        drop(record(&self.state, format!("refresh:{}", self.fqsn))?);
        Ok(())
    }

    async fn up(&self, _opts: &UpOptions) -> Result<Outputs> {
        let state = record(&self.state, format!("up:{}", self.fqsn))?;
        Ok(state.outputs.get(&self.fqsn).cloned().unwrap_or_default())
    }

    async fn destroy(&self, _opts: &DestroyOptions) -> Result<()> {
        let mut state = record(&self.state, format!("destroy:{}", self.fqsn))?;
        state.outputs.remove(&self.fqsn);
        Ok(())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let mut state = record(&self.state, format!("set_config:{}:{}", self.fqsn, key))?;
        state
            .config
            .entry(self.fqsn.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_config(&self, key: &str) -> Result<String> {
        let state = record(&self.state, format!("get_config:{}:{}", self.fqsn, key))?;
        state
            .config
            .get(&self.fqsn)
            .and_then(|c| c.get(key))
            .cloned()
            .ok_or_else(|| EngineError::ConfigNotFound(key.to_string()))
    }

    async fn remove_config(&self, key: &str) -> Result<()> {
        let mut state = record(&self.state, format!("remove_config:{}:{}", self.fqsn, key))?;
        state
            .config
            .get_mut(&self.fqsn)
            .and_then(|c| c.remove(key))
            .map(|_| ())
            .ok_or_else(|| EngineError::ConfigNotFound(key.to_string()))
    }

    async fn outputs(&self) -> Result<Outputs> {
        let state = record(&self.state, format!("outputs:{}", self.fqsn))?;
        Ok(state.outputs.get(&self.fqsn).cloned().unwrap_or_default())
    }
}

/// Lookup answering from a fixed set of present stacks
#[derive(Default)]
pub struct FakeLookup {
    present: Mutex<HashSet<String>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(self, fqsn: impl Into<String>) -> Self {
        if let Ok(mut present) = self.present.lock() {
            present.insert(fqsn.into());
        }
        self
    }
}

#[async_trait]
impl StackLookup for FakeLookup {
    async fn exists(&self, fqsn: &str) -> Result<bool> {
        Ok(self
            .present
            .lock()
            .map(|present| present.contains(fqsn))
            .unwrap_or(false))
    }
}

//! In-memory sync engine for tests

use crate::engine::{RpcReply, SyncEngine, SyncEngineLauncher};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct State {
    /// bucket -> object count
    buckets: BTreeMap<String, usize>,
    calls: Vec<String>,
    env: BTreeMap<String, String>,
    launches: usize,
    failures: BTreeMap<String, u16>,
}

/// Launcher whose engines share one fake bucket store
#[derive(Default, Clone)]
pub struct FakeLauncher {
    state: Arc<Mutex<State>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str, objects: usize) -> Self {
        lock(&self.state).buckets.insert(bucket.to_string(), objects);
        self
    }

    /// Make every call to `method` answer with `status`
    pub fn failing(self, method: &str, status: u16) -> Self {
        lock(&self.state).failures.insert(method.to_string(), status);
        self
    }

    /// Calls as `method fs [rmdirs]`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Environment passed to the last launch
    pub fn env(&self) -> BTreeMap<String, String> {
        lock(&self.state).env.clone()
    }

    pub fn launches(&self) -> usize {
        lock(&self.state).launches
    }

    pub fn object_count(&self, bucket: &str) -> Option<usize> {
        lock(&self.state).buckets.get(bucket).copied()
    }
}

fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl SyncEngineLauncher for FakeLauncher {
    async fn launch(&self, env: &BTreeMap<String, String>) -> Result<Box<dyn SyncEngine>> {
        let mut state = lock(&self.state);
        state.env = env.clone();
        state.launches += 1;
        Ok(Box::new(FakeEngine {
            state: self.state.clone(),
        }))
    }
}

struct FakeEngine {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl SyncEngine for FakeEngine {
    async fn call(&self, method: &str, request: &serde_json::Value) -> Result<RpcReply> {
        let fs = request["fs"].as_str().unwrap_or_default().to_string();
        let bucket = fs.trim_start_matches(":s3:").to_string();
        let rmdirs = request["rmdirs"].as_bool().unwrap_or(false);

        let mut state = lock(&self.state);
        let mut call = format!("{} {}", method, fs);
        if rmdirs {
            call.push_str(" rmdirs");
        }
        state.calls.push(call);

        if let Some(status) = state.failures.get(method) {
            return Ok(reply(*status, r#"{"error":"injected"}"#));
        }
        if !state.buckets.contains_key(&bucket) {
            return Ok(reply(404, r#"{"error":"directory not found"}"#));
        }

        match method {
            "operations/list" => Ok(reply(200, r#"{"list":[]}"#)),
            "operations/delete" => {
                state.buckets.insert(bucket, 0);
                Ok(reply(200, "{}"))
            }
            "operations/purge" => {
                state.buckets.remove(&bucket);
                Ok(reply(200, "{}"))
            }
            _ => Ok(reply(404, r#"{"error":"couldn't find method"}"#)),
        }
    }
}

fn reply(status: u16, body: &str) -> RpcReply {
    RpcReply {
        status,
        body: body.to_string(),
    }
}

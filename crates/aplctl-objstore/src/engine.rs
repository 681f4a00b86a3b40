//! Sync engine abstraction

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Reply to a sync engine RPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    pub status: u16,
    pub body: String,
}

impl RpcReply {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A running file-sync engine accepting RPC calls
#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// Call `method` (e.g. `operations/list`) with a JSON request body
    async fn call(&self, method: &str, request: &serde_json::Value) -> Result<RpcReply>;
}

/// Starts a sync engine configured through environment variables
#[async_trait]
pub trait SyncEngineLauncher: Send + Sync {
    async fn launch(&self, env: &BTreeMap<String, String>) -> Result<Box<dyn SyncEngine>>;
}

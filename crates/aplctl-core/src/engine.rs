//! Provisioning engine abstraction
//!
//! The engine is opaque: it holds remote state per fully-qualified stack
//! name and exposes apply/destroy/refresh plus per-stack config and outputs.

use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Stack outputs by name
pub type Outputs = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpOptions {
    pub parallel: u32,
    pub color: String,
}

impl Default for UpOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            color: "always".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyOptions {
    pub parallel: u32,
    pub color: String,
}

impl Default for DestroyOptions {
    fn default() -> Self {
        Self {
            parallel: 4,
            color: "always".to_string(),
        }
    }
}

#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Select the stack's remote state, creating it if needed
    async fn upsert(&self, fqsn: &str, path: &Path) -> Result<Box<dyn StackHandle>>;

    /// Delete the stack's remote state record
    async fn remove_stack(&self, fqsn: &str, path: &Path, force: bool) -> Result<()>;
}

/// Operations on one selected stack
#[async_trait]
pub trait StackHandle: Send + Sync {
    fn fqsn(&self) -> &str;

    async fn refresh(&self) -> Result<()>;

    async fn up(&self, opts: &UpOptions) -> Result<Outputs>;

    async fn destroy(&self, opts: &DestroyOptions) -> Result<()>;

    async fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `EngineError::ConfigNotFound` when the key is not set
    async fn get_config(&self, key: &str) -> Result<String>;

    async fn remove_config(&self, key: &str) -> Result<()>;

    async fn outputs(&self) -> Result<Outputs>;
}

//! Environment service abstraction

use crate::definition::{EnvironmentDefinition, EnvironmentId};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Remote secrets/config environment service
#[async_trait]
pub trait EnvironmentApi: Send + Sync {
    /// Create an empty environment. Returns `EscError::Conflict` if it exists.
    async fn create(&self, id: &EnvironmentId) -> Result<()>;

    /// Fetch the stored definition. Returns `EscError::NotFound` if absent.
    async fn get(&self, id: &EnvironmentId) -> Result<EnvironmentDefinition>;

    /// Replace the stored definition
    async fn update(&self, id: &EnvironmentId, definition: &EnvironmentDefinition) -> Result<()>;

    /// Open the environment and return its evaluated top-level properties
    async fn open_and_read(&self, id: &EnvironmentId) -> Result<BTreeMap<String, Property>>;

    async fn delete(&self, id: &EnvironmentId) -> Result<()>;
}

/// One evaluated property of an opened environment
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Plain JSON with evaluation metadata stripped
    pub value: Value,

    /// Set when the value (or anything nested in it) was secret-wrapped
    pub secret: bool,
}

impl Property {
    pub fn plain(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }
}

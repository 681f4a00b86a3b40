//! Environment manager
//!
//! High-level operations over one environment. Updates always merge into
//! the remote definition; the merge is read-modify-write and not
//! transactional, so concurrent writers are last-write-wins.

use crate::api::EnvironmentApi;
use crate::definition::{EnvironmentDefinition, EnvironmentId};
use crate::error::{EscError, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Value read back from an environment through the config path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    String(String),
    Integer(i64),
}

impl EnvValue {
    /// Interpret the value as an integer, parsing strings if needed
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            EnvValue::Integer(n) => Some(*n),
            EnvValue::String(s) => s.trim().parse().ok(),
        }
    }
}

/// Manages a single secrets/config environment
#[derive(Clone)]
pub struct EnvironmentManager {
    api: Arc<dyn EnvironmentApi>,
    id: EnvironmentId,
}

impl EnvironmentManager {
    pub fn new(api: Arc<dyn EnvironmentApi>, id: EnvironmentId) -> Self {
        Self { api, id }
    }

    pub fn id(&self) -> &EnvironmentId {
        &self.id
    }

    pub async fn exists(&self) -> Result<bool> {
        match self.api.get(&self.id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the environment. Returns `false` if it was already there.
    pub async fn create(&self) -> Result<bool> {
        match self.api.create(&self.id).await {
            Ok(()) => {
                tracing::info!("created esc environment {}", self.id);
                Ok(true)
            }
            Err(EscError::Conflict(_)) => {
                tracing::info!("esc environment already initialized");
                Ok(false)
            }
            Err(e) => {
                tracing::error!("initialize esc environment {}: {}", self.id, e);
                Err(e)
            }
        }
    }

    /// Create the environment and, only if it is new, write its initial
    /// definition. An existing environment is left untouched.
    pub async fn initialize(
        &self,
        config: Map<String, Value>,
        values: Map<String, Value>,
    ) -> Result<bool> {
        if !self.create().await? {
            return Ok(false);
        }
        self.write(config, values).await.inspect_err(|e| {
            tracing::error!("write initial esc environment: {}", e);
        })?;
        Ok(true)
    }

    /// Replace the definition with `config` and `values` in one update call.
    /// Callers wanting to keep existing keys use [`update`](Self::update).
    pub async fn write(&self, config: Map<String, Value>, values: Map<String, Value>) -> Result<()> {
        let definition = EnvironmentDefinition::new(config, values);
        self.api.update(&self.id, &definition).await
    }

    /// Merge `config` and `values` over the existing definition; new keys win.
    pub async fn update(&self, config: Map<String, Value>, values: Map<String, Value>) -> Result<()> {
        let mut definition = self.api.get(&self.id).await.inspect_err(|e| {
            tracing::error!("get existing esc environment: {}", e);
        })?;
        definition.merge(config, values);
        self.api
            .update(&self.id, &definition)
            .await
            .inspect_err(|e| tracing::error!("write update to esc environment: {}", e))
    }

    /// The raw stored definition, secret markers included
    pub async fn definition(&self) -> Result<EnvironmentDefinition> {
        self.api.get(&self.id).await
    }

    /// Read a string or integer value. Secret values are refused.
    pub async fn read(&self, key: &str) -> Result<EnvValue> {
        let value = self.read_json(key).await?;
        match value {
            Value::String(s) => Ok(EnvValue::String(s)),
            Value::Number(n) => n.as_i64().map(EnvValue::Integer).ok_or_else(|| {
                EscError::UnexpectedType {
                    key: key.to_string(),
                    found: "float",
                }
            }),
            other => Err(EscError::UnexpectedType {
                key: key.to_string(),
                found: json_type(&other),
            }),
        }
    }

    /// Read any non-secret value as JSON
    pub async fn read_json(&self, key: &str) -> Result<Value> {
        let (value, secret) = self.lookup(key).await?;
        if secret {
            return Err(EscError::SecretValue(key.to_string()));
        }
        Ok(value)
    }

    /// Read a value including secret plaintext
    pub async fn reveal_json(&self, key: &str) -> Result<Value> {
        let (value, _) = self.lookup(key).await?;
        Ok(value)
    }

    /// Delete the environment
    pub async fn remove(&self) -> Result<()> {
        self.api.delete(&self.id).await.inspect_err(|e| {
            tracing::error!("delete esc environment: {}", e);
        })?;
        tracing::info!("purged esc environment");
        Ok(())
    }

    async fn lookup(&self, key: &str) -> Result<(Value, bool)> {
        let mut properties = self.api.open_and_read(&self.id).await.inspect_err(|e| {
            tracing::error!("open and read esc environment: {}", e);
        })?;
        let property = properties
            .remove(key)
            .ok_or_else(|| EscError::KeyNotFound(key.to_string()))?;
        Ok((property.value, property.secret))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

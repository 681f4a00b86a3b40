//! In-memory `EnvironmentApi` for tests
//!
//! Evaluation is shallow: `fn::secret` markers are resolved and flagged,
//! interpolations (`${...}`) are returned verbatim.

use crate::api::{EnvironmentApi, Property};
use crate::definition::{EnvironmentDefinition, EnvironmentId, SECRET_MARKER, is_secret};
use crate::error::{EscError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    environments: HashMap<EnvironmentId, EnvironmentDefinition>,
    updates: usize,
}

#[derive(Default)]
pub struct FakeEnvironmentApi {
    state: Mutex<State>,
}

impl FakeEnvironmentApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an environment with a definition
    pub fn with_environment(self, id: EnvironmentId, definition: EnvironmentDefinition) -> Self {
        self.lock().environments.insert(id, definition);
        self
    }

    /// Number of successful `update` calls
    pub fn update_count(&self) -> usize {
        self.lock().updates
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl EnvironmentApi for FakeEnvironmentApi {
    async fn create(&self, id: &EnvironmentId) -> Result<()> {
        let mut state = self.lock();
        if state.environments.contains_key(id) {
            return Err(EscError::Conflict(id.to_string()));
        }
        state
            .environments
            .insert(id.clone(), EnvironmentDefinition::default());
        Ok(())
    }

    async fn get(&self, id: &EnvironmentId) -> Result<EnvironmentDefinition> {
        self.lock()
            .environments
            .get(id)
            .cloned()
            .ok_or_else(|| EscError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &EnvironmentId, definition: &EnvironmentDefinition) -> Result<()> {
        let mut state = self.lock();
        let slot = state
            .environments
            .get_mut(id)
            .ok_or_else(|| EscError::NotFound(id.to_string()))?;
        *slot = definition.clone();
        state.updates += 1;
        Ok(())
    }

    async fn open_and_read(&self, id: &EnvironmentId) -> Result<BTreeMap<String, Property>> {
        let definition = self.get(id).await?;
        let mut properties: BTreeMap<String, Property> = definition
            .values
            .additional
            .iter()
            .map(|(k, v)| {
                let (value, secret) = evaluate(v);
                (k.clone(), Property { value, secret })
            })
            .collect();
        if !definition.values.pulumi_config.is_empty() {
            properties.insert(
                "pulumiConfig".to_string(),
                Property::plain(Value::Object(definition.values.pulumi_config)),
            );
        }
        Ok(properties)
    }

    async fn delete(&self, id: &EnvironmentId) -> Result<()> {
        self.lock()
            .environments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EscError::NotFound(id.to_string()))
    }
}

fn evaluate(value: &Value) -> (Value, bool) {
    if is_secret(value) {
        let inner = value.get(SECRET_MARKER).cloned().unwrap_or(Value::Null);
        return (inner, true);
    }
    match value {
        Value::Object(fields) => {
            let mut secret = false;
            let inner = fields
                .iter()
                .map(|(k, v)| {
                    let (value, s) = evaluate(v);
                    secret |= s;
                    (k.clone(), value)
                })
                .collect();
            (Value::Object(inner), secret)
        }
        Value::Array(items) => {
            let mut secret = false;
            let inner = items
                .iter()
                .map(|v| {
                    let (value, s) = evaluate(v);
                    secret |= s;
                    value
                })
                .collect();
            (Value::Array(inner), secret)
        }
        other => (other.clone(), false),
    }
}

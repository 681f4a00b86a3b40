//! Pulumi ESC REST client

use crate::api::{EnvironmentApi, Property};
use crate::definition::{EnvironmentDefinition, EnvironmentId};
use crate::error::{EscError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

const PULUMI_API_BASE: &str = "https://api.pulumi.com";

/// Configuration for the ESC client
#[derive(Debug, Clone)]
pub struct EscConfig {
    pub access_token: String,
    pub api_url: String,
}

impl EscConfig {
    /// Create EscConfig from `PULUMI_ACCESS_TOKEN` and optional `PULUMI_API_URL`
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("PULUMI_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EscError::MissingEnvVar("PULUMI_ACCESS_TOKEN".to_string()))?;
        let api_url = std::env::var("PULUMI_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| PULUMI_API_BASE.to_string());

        Ok(Self {
            access_token,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// ESC environment client
pub struct EscClient {
    client: reqwest::Client,
    config: EscConfig,
}

impl EscClient {
    pub fn new(config: EscConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn env_url(&self, id: &EnvironmentId) -> String {
        format!(
            "{}/api/esc/environments/{}/{}/{}",
            self.config.api_url, id.org, id.project, id.name
        )
    }

    fn auth(&self) -> String {
        format!("token {}", self.config.access_token)
    }

    async fn check(&self, response: reqwest::Response, id: &EnvironmentId) -> Result<String> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        match status {
            200..=299 => Ok(body),
            404 => Err(EscError::NotFound(id.to_string())),
            409 => Err(EscError::Conflict(id.to_string())),
            401 | 403 => Err(EscError::Unauthorized(api_message(&body))),
            _ => Err(EscError::Api {
                status,
                message: api_message(&body),
            }),
        }
    }
}

#[async_trait]
impl EnvironmentApi for EscClient {
    async fn create(&self, id: &EnvironmentId) -> Result<()> {
        let url = format!("{}/api/esc/environments/{}", self.config.api_url, id.org);
        tracing::debug!("ESC: create {}", id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&json!({ "project": id.project, "name": id.name }))
            .send()
            .await?;
        self.check(response, id).await?;
        Ok(())
    }

    async fn get(&self, id: &EnvironmentId) -> Result<EnvironmentDefinition> {
        tracing::debug!("ESC: get {}", id);
        let response = self
            .client
            .get(self.env_url(id))
            .header("Authorization", self.auth())
            .header("Accept", "application/x-yaml")
            .send()
            .await?;
        let body = self.check(response, id).await?;
        EnvironmentDefinition::from_yaml(&body)
    }

    async fn update(&self, id: &EnvironmentId, definition: &EnvironmentDefinition) -> Result<()> {
        tracing::debug!("ESC: update {}", id);
        let response = self
            .client
            .patch(self.env_url(id))
            .header("Authorization", self.auth())
            .header("Content-Type", "application/x-yaml")
            .body(definition.to_yaml()?)
            .send()
            .await?;
        let body = self.check(response, id).await?;

        // Validation problems come back with a 200 and a diagnostics list.
        if let Ok(diag) = serde_json::from_str::<UpdateResponse>(&body)
            && let Some(first) = diag.diagnostics.first()
        {
            return Err(EscError::Api {
                status: 400,
                message: first.summary.clone(),
            });
        }
        Ok(())
    }

    async fn open_and_read(&self, id: &EnvironmentId) -> Result<BTreeMap<String, Property>> {
        tracing::debug!("ESC: open {}", id);
        let response = self
            .client
            .post(format!("{}/open?duration=2h", self.env_url(id)))
            .header("Authorization", self.auth())
            .send()
            .await?;
        let body = self.check(response, id).await?;
        let session: OpenResponse = serde_json::from_str(&body)?;

        let response = self
            .client
            .get(format!("{}/open/{}", self.env_url(id), session.id))
            .header("Authorization", self.auth())
            .send()
            .await?;
        let body = self.check(response, id).await?;
        let opened: OpenedEnvironment = serde_json::from_str(&body)?;

        Ok(opened
            .properties
            .iter()
            .map(|(k, v)| {
                let (value, secret) = unwrap_property(v);
                (k.clone(), Property { value, secret })
            })
            .collect())
    }

    async fn delete(&self, id: &EnvironmentId) -> Result<()> {
        tracing::debug!("ESC: delete {}", id);
        let response = self
            .client
            .delete(self.env_url(id))
            .header("Authorization", self.auth())
            .send()
            .await?;
        self.check(response, id).await?;
        Ok(())
    }
}

/// Strip `{value, secret, trace}` wrappers from an evaluated property tree.
fn unwrap_property(property: &Value) -> (Value, bool) {
    let secret = property
        .get("secret")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match property.get("value") {
        Some(Value::Object(fields)) => {
            let mut any_secret = secret;
            let inner = fields
                .iter()
                .map(|(k, v)| {
                    let (value, s) = unwrap_property(v);
                    any_secret |= s;
                    (k.clone(), value)
                })
                .collect();
            (Value::Object(inner), any_secret)
        }
        Some(Value::Array(items)) => {
            let mut any_secret = secret;
            let inner = items
                .iter()
                .map(|v| {
                    let (value, s) = unwrap_property(v);
                    any_secret |= s;
                    value
                })
                .collect();
            (Value::Array(inner), any_secret)
        }
        Some(scalar) => (scalar.clone(), secret),
        None => (Value::Null, secret),
    }
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OpenedEnvironment {
    #[serde(default)]
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Deserialize)]
struct Diagnostic {
    summary: String,
}

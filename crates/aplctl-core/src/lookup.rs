//! Stack presence lookup against the hosted state service

use crate::engine::Result;
use crate::error::EngineError;
use async_trait::async_trait;

const PULUMI_API_BASE: &str = "https://api.pulumi.com";

#[async_trait]
pub trait StackLookup: Send + Sync {
    /// Whether remote state exists for `fqsn`
    async fn exists(&self, fqsn: &str) -> Result<bool>;
}

/// `GET /api/stacks/{fqsn}`: 404 means absent, any other status present
pub struct PulumiCloudLookup {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
}

impl PulumiCloudLookup {
    pub fn new(api_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Create from `PULUMI_ACCESS_TOKEN` and optional `PULUMI_API_URL`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("PULUMI_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EngineError::MissingEnvVar("PULUMI_ACCESS_TOKEN".to_string()))?;
        let api_url = std::env::var("PULUMI_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| PULUMI_API_BASE.to_string());
        Ok(Self::new(api_url, token))
    }

    fn stack_url(&self, fqsn: &str) -> String {
        format!("{}/api/stacks/{}", self.api_url, fqsn)
    }
}

#[async_trait]
impl StackLookup for PulumiCloudLookup {
    async fn exists(&self, fqsn: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.stack_url(fqsn))
            .header("Accept", "application/vnd.pulumi+8")
            .header("Authorization", format!("token {}", self.access_token))
            .send()
            .await
            .map_err(|e| EngineError::Lookup(e.to_string()))?;

        let status = response.status();
        tracing::debug!("stack lookup {}: {}", fqsn, status);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            tracing::warn!("stack lookup {} returned {}, assuming it exists", fqsn, status);
        }
        Ok(true)
    }
}

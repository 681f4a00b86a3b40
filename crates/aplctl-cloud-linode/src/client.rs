//! Linode API client
//!
//! Direct Linode v4 API implementation for the resources cluster cleanup
//! touches. Uses Bearer token authentication.

use crate::error::{LinodeError, Result};
use aplctl_cloud::{NodeBalancer, ResourceApi, RetryConfig, Volume};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

const LINODE_API_BASE: &str = "https://api.linode.com/v4";

/// Configuration for the Linode client
#[derive(Debug, Clone)]
pub struct LinodeConfig {
    pub token: String,
    pub base_url: String,
    /// Applied to HTTP 400 responses, which Linode returns while a volume is
    /// still detaching
    pub retry: RetryConfig,
}

impl LinodeConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: LINODE_API_BASE.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Create LinodeConfig from the `LINODE_TOKEN` environment variable
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("LINODE_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LinodeError::MissingEnvVar("LINODE_TOKEN".to_string()))?;
        Ok(Self::new(token))
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Linode v4 client
pub struct LinodeClient {
    client: reqwest::Client,
    config: LinodeConfig,
}

impl LinodeClient {
    pub fn new(config: LinodeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// List all volumes, following pagination
    pub async fn volumes(&self) -> Result<Vec<Volume>> {
        let volumes: Vec<ApiVolume> = self.list_all("/volumes").await?;
        Ok(volumes.into_iter().map(Volume::from).collect())
    }

    /// List all NodeBalancers, following pagination
    pub async fn node_balancers(&self) -> Result<Vec<NodeBalancer>> {
        let balancers: Vec<ApiNodeBalancer> = self.list_all("/nodebalancers").await?;
        Ok(balancers.into_iter().map(NodeBalancer::from).collect())
    }

    pub async fn update_volume_tags(&self, volume_id: u64, tags: &[String]) -> Result<()> {
        let path = format!("/volumes/{}", volume_id);
        self.send(Method::PUT, &path, Some(json!({ "tags": tags })))
            .await?;
        Ok(())
    }

    pub async fn detach(&self, volume_id: u64) -> Result<()> {
        let path = format!("/volumes/{}/detach", volume_id);
        match self.send(Method::POST, &path, None).await {
            Err(LinodeError::Api { status: 400, reason }) if is_not_attached(&reason) => {
                Err(LinodeError::NotAttached(volume_id))
            }
            other => other.map(|_| ()),
        }
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let body = self
                .send(Method::GET, &format!("{}?page={}", path, page), None)
                .await?;
            let parsed: Page<T> = serde_json::from_str(&body)?;
            items.extend(parsed.data);
            if parsed.page >= parsed.pages {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// Send a request, retrying on HTTP 400 per the configured policy.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut attempt = 0;
        loop {
            tracing::debug!("Linode API: {} {}", method, url);
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&self.config.token);
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            if (200..300).contains(&status) {
                return Ok(text);
            }

            let err = classify(status, path, &text);
            let retryable = matches!(&err, LinodeError::Api { status: 400, reason } if !is_not_attached(reason));
            if !retryable || attempt >= self.config.retry.max_attempts {
                return Err(err);
            }

            let delay = self.config.retry.delay_for_attempt(attempt);
            tracing::debug!(
                "Linode API returned 400 for {}, retrying in {:?} ({}/{})",
                path,
                delay,
                attempt + 1,
                self.config.retry.max_attempts
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl ResourceApi for LinodeClient {
    fn name(&self) -> &str {
        "linode"
    }

    async fn list_volumes(&self) -> aplctl_cloud::Result<Vec<Volume>> {
        Ok(self.volumes().await?)
    }

    async fn tag_volume(&self, volume_id: u64, tags: &[String]) -> aplctl_cloud::Result<()> {
        Ok(self.update_volume_tags(volume_id, tags).await?)
    }

    async fn detach_volume(&self, volume_id: u64) -> aplctl_cloud::Result<()> {
        Ok(self.detach(volume_id).await?)
    }

    async fn delete_volume(&self, volume_id: u64) -> aplctl_cloud::Result<()> {
        Ok(self.delete(&format!("/volumes/{}", volume_id)).await?)
    }

    async fn list_node_balancers(&self) -> aplctl_cloud::Result<Vec<NodeBalancer>> {
        Ok(self.node_balancers().await?)
    }

    async fn delete_node_balancer(&self, node_balancer_id: u64) -> aplctl_cloud::Result<()> {
        Ok(self
            .delete(&format!("/nodebalancers/{}", node_balancer_id))
            .await?)
    }

    async fn delete_cluster(&self, cluster_id: u64) -> aplctl_cloud::Result<()> {
        Ok(self.delete(&format!("/lke/clusters/{}", cluster_id)).await?)
    }
}

/// Map a non-2xx response onto a typed error
fn classify(status: u16, path: &str, body: &str) -> LinodeError {
    let reason = serde_json::from_str::<ApiErrors>(body)
        .ok()
        .and_then(|e| e.errors.into_iter().next())
        .map(|e| e.reason)
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        404 => LinodeError::NotFound(path.trim_start_matches('/').to_string()),
        401 | 403 => LinodeError::Unauthorized(reason),
        _ => LinodeError::Api { status, reason },
    }
}

fn is_not_attached(reason: &str) -> bool {
    reason.to_ascii_lowercase().contains("not attached")
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default = "one")]
    page: u32,
    #[serde(default = "one")]
    pages: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ApiErrors {
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ApiVolume {
    id: u64,
    label: String,
    linode_id: Option<u64>,
    linode_label: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<ApiVolume> for Volume {
    fn from(v: ApiVolume) -> Self {
        Volume {
            id: v.id,
            label: v.label,
            linode_id: v.linode_id,
            linode_label: v.linode_label,
            tags: v.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiNodeBalancer {
    id: u64,
    label: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<ApiNodeBalancer> for NodeBalancer {
    fn from(nb: ApiNodeBalancer) -> Self {
        NodeBalancer {
            id: nb.id,
            label: nb.label,
            tags: nb.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_page() {
        let body = r#"{
            "data": [
                {
                    "id": 12345,
                    "label": "pvc0123456789abcdef",
                    "status": "active",
                    "size": 10,
                    "region": "nl-ams",
                    "linode_id": 98765,
                    "linode_label": "lke123-456-0abc1def",
                    "tags": []
                },
                {
                    "id": 12346,
                    "label": "pvcfedcba9876543210",
                    "linode_id": null,
                    "linode_label": null,
                    "tags": ["demo-volume"]
                }
            ],
            "page": 1,
            "pages": 2,
            "results": 27
        }"#;

        let page: Page<ApiVolume> = serde_json::from_str(body).unwrap();
        assert_eq!(page.pages, 2);

        let volumes: Vec<Volume> = page.data.into_iter().map(Volume::from).collect();
        assert!(volumes[0].attached_to("lke123"));
        assert!(!volumes[1].attached_to("lke123"));
        assert!(volumes[1].has_tag("demo-volume"));
    }

    #[test]
    fn test_parse_node_balancer_without_pagination_fields() {
        let body = r#"{"data": [{"id": 7, "label": "ccm-lke123", "tags": []}]}"#;
        let page: Page<ApiNodeBalancer> = serde_json::from_str(body).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 1);
        let nb = NodeBalancer::from(page.data.into_iter().next().unwrap());
        assert!(nb.label_contains("lke123"));
    }

    #[test]
    fn test_classify_errors() {
        let not_found = classify(404, "/lke/clusters/1", r#"{"errors":[{"reason":"Not found"}]}"#);
        assert!(matches!(not_found, LinodeError::NotFound(ref p) if p == "lke/clusters/1"));

        let auth = classify(401, "/volumes", r#"{"errors":[{"reason":"Invalid Token"}]}"#);
        assert!(matches!(auth, LinodeError::Unauthorized(ref r) if r == "Invalid Token"));

        let attached = classify(
            400,
            "/volumes/1",
            r#"{"errors":[{"reason":"Volume is attached to a Linode"}]}"#,
        );
        assert!(matches!(attached, LinodeError::Api { status: 400, .. }));

        let plain = classify(500, "/volumes", "upstream timeout\n");
        assert!(matches!(plain, LinodeError::Api { ref reason, .. } if reason == "upstream timeout"));
    }

    #[test]
    fn test_not_found_maps_to_cloud_not_found() {
        let err: aplctl_cloud::CloudError = LinodeError::NotFound("volumes/1".into()).into();
        assert!(err.is_not_found());

        let err: aplctl_cloud::CloudError = LinodeError::NotAttached(1).into();
        assert!(err.is_already_detached());
    }

    #[test]
    fn test_is_not_attached() {
        assert!(is_not_attached("Volume is not attached to a Linode."));
        assert!(!is_not_attached("Volume is attached to a Linode"));
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_var("LINODE_TOKEN", Some("abc"), || {
            let config = LinodeConfig::from_env().unwrap();
            assert_eq!(config.token, "abc");
            assert_eq!(config.base_url, LINODE_API_BASE);
        });

        temp_env::with_var("LINODE_TOKEN", None::<&str>, || {
            assert!(matches!(
                LinodeConfig::from_env(),
                Err(LinodeError::MissingEnvVar(_))
            ));
        });
    }

    mod retry {
        use super::*;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        const STILL_ATTACHED: &str = r#"{"errors":[{"reason":"Volume is attached to a Linode"}]}"#;
        const NOT_ATTACHED: &str = r#"{"errors":[{"reason":"Volume is not attached to a Linode."}]}"#;

        /// Serve `responses` in order, one per connection, repeating the last
        async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();

            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }

                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let (status, body) = responses[n.min(responses.len() - 1)];
                    let reply = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });

            (format!("http://{}", addr), hits)
        }

        fn client(base_url: &str, max_attempts: u32) -> LinodeClient {
            let retry = RetryConfig {
                max_attempts,
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                backoff_multiplier: 2.0,
            };
            LinodeClient::new(
                LinodeConfig::new("token")
                    .with_base_url(base_url)
                    .with_retry(retry),
            )
        }

        #[tokio::test]
        async fn test_persistent_400_gives_up_after_max_attempts() {
            let (url, hits) = serve(vec![(400, STILL_ATTACHED)]).await;

            let err = client(&url, 3).delete("/volumes/1").await.unwrap_err();

            assert!(matches!(err, LinodeError::Api { status: 400, .. }));
            // First request plus three retries
            assert_eq!(hits.load(Ordering::SeqCst), 4);
        }

        #[tokio::test]
        async fn test_400_then_success() {
            let (url, hits) = serve(vec![(400, STILL_ATTACHED), (200, "{}")]).await;

            client(&url, 3).delete("/volumes/1").await.unwrap();

            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn test_not_attached_is_not_retried() {
            let (url, hits) = serve(vec![(400, NOT_ATTACHED)]).await;

            let err = client(&url, 3).detach(1).await.unwrap_err();

            assert!(matches!(err, LinodeError::NotAttached(1)));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_other_errors_are_not_retried() {
            let (url, hits) = serve(vec![(404, r#"{"errors":[{"reason":"Not found"}]}"#)]).await;

            let err = client(&url, 3).delete("/lke/clusters/9").await.unwrap_err();

            assert!(matches!(err, LinodeError::NotFound(_)));
            assert_eq!(hits.load(Ordering::SeqCst), 1);
        }
    }
}

//! Bucket purger

use crate::engine::SyncEngineLauncher;
use crate::error::{ObjectStoreError, Result};
use crate::remote::S3Remote;
use serde::Serialize;
use std::sync::Arc;

const LIST: &str = "operations/list";
const DELETE: &str = "operations/delete";
const PURGE: &str = "operations/purge";

#[derive(Debug, Serialize)]
struct PurgeRequest<'a> {
    fs: String,
    remote: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    rmdirs: bool,
}

/// What happened to one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketAction {
    /// Contents deleted, bucket kept
    Emptied,
    /// Bucket removed with its contents
    Purged,
    /// Bucket does not exist
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOutcome {
    pub bucket: String,
    pub action: BucketAction,
}

/// Per-bucket results of a purge
#[derive(Debug, Clone, Default)]
pub struct PurgeReport {
    pub buckets: Vec<BucketOutcome>,
}

impl PurgeReport {
    pub fn action_for(&self, bucket: &str) -> Option<BucketAction> {
        self.buckets
            .iter()
            .find(|b| b.bucket == bucket)
            .map(|b| b.action)
    }
}

/// Empties or removes every bucket of a remote
pub struct ObjectStorePurger {
    launcher: Arc<dyn SyncEngineLauncher>,
}

impl ObjectStorePurger {
    pub fn new(launcher: Arc<dyn SyncEngineLauncher>) -> Self {
        Self { launcher }
    }

    /// Purge all buckets configured on `remote`. Missing buckets are skipped.
    pub async fn purge(&self, remote: &S3Remote) -> Result<PurgeReport> {
        let mut remote = remote.clone();
        let env = remote.init().inspect_err(|e| {
            tracing::error!("initialize s3 remote: {}", e);
        })?;
        let engine = self.launcher.launch(&env).await?;

        let buckets = remote.bucket_names();
        let total = buckets.len();
        let mut report = PurgeReport::default();

        for (idx, bucket) in buckets.iter().enumerate() {
            let n = idx + 1;
            let mut request = PurgeRequest {
                fs: format!(":s3:{}", bucket),
                remote: "",
                rmdirs: false,
            };

            let listed = engine.call(LIST, &serde_json::to_value(&request)?).await?;
            if listed.status == 404 {
                tracing::info!("({}/{}) skipping bucket {}", n, total, bucket);
                report.buckets.push(BucketOutcome {
                    bucket: bucket.clone(),
                    action: BucketAction::Skipped,
                });
                continue;
            }
            if !listed.is_ok() {
                let err = rpc_error(LIST, listed.status, listed.body);
                tracing::error!("list bucket operation: {}", err);
                return Err(err);
            }

            let (method, action) = if remote.purge_enabled {
                (PURGE, BucketAction::Purged)
            } else {
                request.rmdirs = true;
                (DELETE, BucketAction::Emptied)
            };

            tracing::info!("({}/{}) deleting objects in bucket {}", n, total, bucket);
            let reply = engine.call(method, &serde_json::to_value(&request)?).await?;
            if !reply.is_ok() {
                let err = rpc_error(method, reply.status, reply.body);
                tracing::error!("delete bucket operation: {}", err);
                return Err(err);
            }

            report.buckets.push(BucketOutcome {
                bucket: bucket.clone(),
                action,
            });
        }

        Ok(report)
    }
}

fn rpc_error(method: &str, status: u16, body: String) -> ObjectStoreError {
    ObjectStoreError::Rpc {
        method: method.to_string(),
        status,
        body,
    }
}

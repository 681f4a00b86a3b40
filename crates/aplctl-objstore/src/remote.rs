//! S3-compatible remote definition

use crate::error::{ObjectStoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_PROVIDER: &str = "Other";
const DEFAULT_ACL: &str = "private";

/// An S3-compatible remote and the buckets to purge on it
///
/// Field names follow the JSON blobs stored in the environment
/// (`objBuckets`, `objKey`), so both can be deserialized straight into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Remote {
    #[serde(rename = "accessKey", default, skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub acl: String,

    /// Logical bucket role -> bucket name
    #[serde(rename = "objBuckets", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buckets: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    /// Remove the buckets themselves, not only their contents
    #[serde(rename = "purge", default)]
    pub purge_enabled: bool,

    #[serde(rename = "name", default, skip_serializing_if = "String::is_empty")]
    pub remote: String,

    #[serde(rename = "secretKey", default, skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
}

impl S3Remote {
    pub fn new(endpoint: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            remote: remote.into(),
            ..Self::default()
        }
    }

    /// Fill fields from a JSON blob; only fields present in the blob are taken.
    pub fn merge_json(&mut self, blob: &serde_json::Value) -> Result<()> {
        let other: S3Remote = serde_json::from_value(blob.clone())?;
        if !other.access_key_id.is_empty() {
            self.access_key_id = other.access_key_id;
        }
        if !other.secret_access_key.is_empty() {
            self.secret_access_key = other.secret_access_key;
        }
        if !other.acl.is_empty() {
            self.acl = other.acl;
        }
        if !other.provider.is_empty() {
            self.provider = other.provider;
        }
        if !other.endpoint.is_empty() {
            self.endpoint = other.endpoint;
        }
        if !other.remote.is_empty() {
            self.remote = other.remote;
        }
        if !other.buckets.is_empty() {
            self.buckets = other.buckets;
        }
        self.purge_enabled |= other.purge_enabled;
        Ok(())
    }

    /// Validate required fields, apply defaults, and return the environment
    /// the sync engine needs for this remote.
    pub fn init(&mut self) -> Result<BTreeMap<String, String>> {
        let missing: Vec<&str> = [
            ("AccessKeyId", &self.access_key_id),
            ("SecretAccessKey", &self.secret_access_key),
            ("Endpoint", &self.endpoint),
            ("Remote", &self.remote),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            return Err(ObjectStoreError::MissingField(missing.join(", ")));
        }

        if self.provider.is_empty() {
            self.provider = DEFAULT_PROVIDER.to_string();
        }
        if self.acl.is_empty() {
            self.acl = DEFAULT_ACL.to_string();
        }

        // https://rclone.org/s3/#standard-options
        Ok(BTreeMap::from([
            ("RCLONE_S3_ACCESS_KEY_ID".to_string(), self.access_key_id.clone()),
            ("RCLONE_S3_ACL".to_string(), self.acl.clone()),
            ("RCLONE_S3_ENDPOINT".to_string(), self.endpoint.clone()),
            ("RCLONE_S3_ENV_AUTH".to_string(), "true".to_string()),
            ("RCLONE_S3_PROVIDER".to_string(), self.provider.clone()),
            (
                "RCLONE_S3_SECRET_ACCESS_KEY".to_string(),
                self.secret_access_key.clone(),
            ),
        ]))
    }

    /// Bucket names in a stable order
    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.values().cloned().collect()
    }
}

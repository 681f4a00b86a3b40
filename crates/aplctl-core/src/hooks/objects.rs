//! Object storage purge hook
use super::{Hook, HookContext};
use crate::error::HookError;
use aplctl_esc::EscError;
use aplctl_objstore::{ObjectStorePurger, S3Remote};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Environment key with the `{role: bucket}` map
const BUCKETS_KEY: &str = "objBuckets";
/// Environment key with the `{accessKey, secretKey}` blob
const ACCESS_KEY_KEY: &str = "objKey";

/// Empties every object storage bucket recorded for the platform.
pub struct DeleteObj;

#[async_trait]
impl Hook for DeleteObj {
    async fn run(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let services = ctx.services;
        let platform = &services.platform;

        let buckets = match services.environment.read_json(BUCKETS_KEY).await {
            Ok(value) => value,
            Err(EscError::KeyNotFound(_)) => {
                tracing::info!("no {} recorded for {}, nothing to purge", BUCKETS_KEY, platform.name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let buckets: BTreeMap<String, String> = serde_json::from_value(json_blob(buckets)?)?;
        if buckets.is_empty() {
            tracing::info!("{} is empty, nothing to purge", BUCKETS_KEY);
            return Ok(());
        }

        let mut remote = S3Remote::new(platform.object_endpoint(), platform.name.clone());
        remote.buckets = buckets;

        let key = services.environment.reveal_json(ACCESS_KEY_KEY).await?;
        remote.merge_json(&json_blob(key)?)?;

        let report = ObjectStorePurger::new(services.object_store.clone())
            .purge(&remote)
            .await?;
        tracing::info!(
            "object storage purge done: {} buckets handled",
            report.buckets.len()
        );
        Ok(())
    }
}

/// Blobs may be stored either as JSON objects or as JSON-encoded strings.
fn json_blob(value: Value) -> Result<Value, HookError> {
    match value {
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProvisioningEngine;
    use crate::hooks::testing::*;
    use crate::stack::Stack;
    use aplctl_esc::fake::FakeEnvironmentApi;
    use aplctl_esc::{EnvironmentDefinition, secret};
    use aplctl_objstore::fake::FakeLauncher;
    use serde_json::{Map, json};

    fn environment(values: Map<String, Value>) -> FakeEnvironmentApi {
        FakeEnvironmentApi::new().with_environment(env_id(), EnvironmentDefinition::new(Map::new(), values))
    }

    async fn run_delete_obj(fx: &Fixture) -> Result<(), HookError> {
        let services = fx.services();
        let stack = Stack::new("infra", "/cmd/infra");
        let handle = fx.engine.upsert("acme/demo-infra/dev", &stack.path).await.unwrap();
        let ctx = HookContext {
            stack: &stack,
            handle: handle.as_ref(),
            engine: fx.engine.as_ref(),
            lookup: fx.lookup.as_ref(),
            downstream: None,
            services: &services,
        };
        DeleteObj.run(&ctx).await
    }

    #[tokio::test]
    async fn test_delete_obj_purges_recorded_buckets() {
        let mut values = Map::new();
        values.insert(
            BUCKETS_KEY.into(),
            json!(r#"{"loki":"demo-loki","harbor":"demo-harbor"}"#),
        );
        values.insert(
            ACCESS_KEY_KEY.into(),
            secret(json!({"accessKey": "AK", "secretKey": "SK"})),
        );
        let fx = Fixture::new()
            .with_environment(environment(values))
            .with_objects(FakeLauncher::new().with_bucket("demo-loki", 4));

        run_delete_obj(&fx).await.unwrap();

        assert_eq!(fx.objects.object_count("demo-loki"), Some(0));
        let env = fx.objects.env();
        assert_eq!(env["RCLONE_S3_ENDPOINT"], "nl-ams-1.linodeobjects.com");
        assert_eq!(env["RCLONE_S3_ACCESS_KEY_ID"], "AK");
        assert_eq!(env["RCLONE_S3_SECRET_ACCESS_KEY"], "SK");
        assert!(fx
            .objects
            .calls()
            .contains(&"operations/list :s3:demo-harbor".to_string()));
    }

    #[tokio::test]
    async fn test_delete_obj_without_buckets_is_noop() {
        let fx = Fixture::new().with_environment(environment(Map::new()));

        run_delete_obj(&fx).await.unwrap();

        assert_eq!(fx.objects.launches(), 0);
    }

    #[tokio::test]
    async fn test_delete_obj_missing_key_fails() {
        let mut values = Map::new();
        values.insert(BUCKETS_KEY.into(), json!({"loki": "demo-loki"}));
        let fx = Fixture::new().with_environment(environment(values));

        assert!(matches!(
            run_delete_obj(&fx).await,
            Err(HookError::Environment(EscError::KeyNotFound(_)))
        ));
        assert_eq!(fx.objects.launches(), 0);
    }

    #[test]
    fn test_json_blob() {
        assert_eq!(json_blob(json!(r#"{"a":"b"}"#)).unwrap(), json!({"a": "b"}));
        assert_eq!(json_blob(json!({"a": "b"})).unwrap(), json!({"a": "b"}));
        assert!(json_blob(json!("not json")).is_err());
    }
}

//! Managed cluster teardown hook
use super::{Hook, HookContext, cluster_id};
use crate::error::HookError;
use aplctl_cloud::ClusterReaper;
use async_trait::async_trait;

/// Removes the managed cluster and the volumes and load balancers it
/// leaves behind.
pub struct CleanupLke;

#[async_trait]
impl Hook for CleanupLke {
    async fn run(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let id = cluster_id(ctx).await?;
        let services = ctx.services;

        let report = ClusterReaper::new(services.resources.as_ref(), services.platform.volume_tag())
            .with_settings(services.cleanup.clone())
            .purge_cluster_resources(id)
            .await?;

        tracing::info!(cluster_id = id, "lke cleanup: {}", report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProvisioningEngine;
    use crate::hooks::LKE_ID_KEY;
    use crate::hooks::testing::*;
    use crate::stack::Stack;
    use aplctl_cloud::Volume;
    use aplctl_cloud::fake::FakeResourceApi;
    use aplctl_esc::EnvironmentDefinition;
    use aplctl_esc::fake::FakeEnvironmentApi;
    use serde_json::{Map, json};

    fn volume(id: u64, node: Option<&str>, tags: &[&str]) -> Volume {
        Volume {
            id,
            label: format!("pvc-{}", id),
            linode_id: node.map(|_| 2000 + id),
            linode_label: node.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_cleanup_lke_from_stack_config() {
        let fx = Fixture::new().with_resources(
            FakeResourceApi::new()
                .with_cluster(77)
                .with_volume(volume(1, Some("lke77-pool-a"), &[]))
                .with_volume(volume(2, Some("lke8-pool-a"), &[])),
        );
        fx.engine.set_stack_config("acme/demo-apl/dev", LKE_ID_KEY, "77");
        let services = fx.services();
        let stack = Stack::new("apl", "/cmd/apl");
        let handle = fx.engine.upsert("acme/demo-apl/dev", &stack.path).await.unwrap();
        let ctx = HookContext {
            stack: &stack,
            handle: handle.as_ref(),
            engine: fx.engine.as_ref(),
            lookup: fx.lookup.as_ref(),
            downstream: None,
            services: &services,
        };

        CleanupLke.run(&ctx).await.unwrap();

        assert!(!fx.resources.has_cluster(77));
        assert_eq!(fx.resources.remaining_volume_ids(), vec![2]);
    }

    #[tokio::test]
    async fn test_cleanup_lke_after_stack_state_is_gone() {
        // Stack config was already emptied by destroy; the id survives in the
        // environment and leftover volumes carry the recovery tag.
        let mut values = Map::new();
        values.insert(LKE_ID_KEY.into(), json!("77"));
        let fx = Fixture::new()
            .with_resources(
                FakeResourceApi::new()
                    .with_volume(volume(1, None, &["demo-volume"]))
                    .with_volume(volume(2, None, &[])),
            )
            .with_environment(FakeEnvironmentApi::new().with_environment(
                env_id(),
                EnvironmentDefinition::new(Map::new(), values),
            ));
        let services = fx.services();
        let stack = Stack::new("apl", "/cmd/apl");
        let handle = fx.engine.upsert("acme/demo-apl/dev", &stack.path).await.unwrap();
        let ctx = HookContext {
            stack: &stack,
            handle: handle.as_ref(),
            engine: fx.engine.as_ref(),
            lookup: fx.lookup.as_ref(),
            downstream: None,
            services: &services,
        };

        CleanupLke.run(&ctx).await.unwrap();

        assert_eq!(fx.resources.remaining_volume_ids(), vec![2]);
        assert!(fx.resources.calls().contains(&"delete_cluster:77".to_string()));
    }

    #[tokio::test]
    async fn test_cleanup_lke_without_any_id_fails() {
        let fx = Fixture::new().with_environment(
            FakeEnvironmentApi::new().with_environment(env_id(), EnvironmentDefinition::default()),
        );
        let services = fx.services();
        let stack = Stack::new("apl", "/cmd/apl");
        let handle = fx.engine.upsert("acme/demo-apl/dev", &stack.path).await.unwrap();
        let ctx = HookContext {
            stack: &stack,
            handle: handle.as_ref(),
            engine: fx.engine.as_ref(),
            lookup: fx.lookup.as_ref(),
            downstream: None,
            services: &services,
        };

        assert!(matches!(
            CleanupLke.run(&ctx).await,
            Err(HookError::Environment(_))
        ));
        assert!(fx.resources.calls().is_empty());
    }
}

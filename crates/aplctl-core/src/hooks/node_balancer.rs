//! Load balancer id hand-off between stacks

use super::{Hook, HookContext, NODE_BALANCER_ID_KEY, cluster_id};
use crate::error::{EngineError, HookError};
use crate::value::OutputValue;
use aplctl_cloud::ClusterReaper;
use async_trait::async_trait;

/// Output holding the infrastructure stack's exported values
const INFRA_OUTPUTS: &str = "infraStackOutputs";
const LOAD_BALANCER_ID: &str = "loadbalancerId";

/// Copies the load balancer id from the applied stack's outputs into the
/// next stack's config.
pub struct AddNodeBalancerId;

#[async_trait]
impl Hook for AddNodeBalancerId {
    async fn run(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let outputs = ctx.handle.outputs().await?;

        let exported = outputs
            .get(INFRA_OUTPUTS)
            .ok_or_else(|| HookError::MissingOutput(INFRA_OUTPUTS.to_string()))?;
        let exported = OutputValue::decode(INFRA_OUTPUTS, exported)?.into_object(INFRA_OUTPUTS)?;

        let id = exported
            .get(LOAD_BALANCER_ID)
            .ok_or_else(|| HookError::MissingOutput(LOAD_BALANCER_ID.to_string()))?;
        let id = OutputValue::decode(LOAD_BALANCER_ID, id)?.into_text(LOAD_BALANCER_ID)?;

        let downstream = ctx
            .downstream
            .ok_or_else(|| HookError::NoDownstream(ctx.stack.name.clone()))?;
        let fqsn = downstream
            .full_name
            .as_deref()
            .ok_or_else(|| HookError::NoDownstream(ctx.stack.name.clone()))?;

        let next = ctx.engine.upsert(fqsn, &downstream.path).await?;
        next.set_config(NODE_BALANCER_ID_KEY, &id).await?;

        tracing::info!(
            "set {} = {} on {} stack",
            NODE_BALANCER_ID_KEY,
            id,
            downstream.name
        );
        Ok(())
    }
}

/// Deletes the cluster's load balancers and drops the id from the stack
/// [`AddNodeBalancerId`] wrote it to.
pub struct RmNodeBalancerId;

#[async_trait]
impl Hook for RmNodeBalancerId {
    async fn run(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        let id = cluster_id(ctx).await?;
        let services = ctx.services;

        let report = ClusterReaper::new(services.resources.as_ref(), services.platform.volume_tag())
            .with_settings(services.cleanup.clone())
            .delete_node_balancers(id)
            .await?;
        tracing::info!("nodebalancer cleanup: {}", report);

        let Some((downstream, fqsn)) = ctx
            .downstream
            .and_then(|s| s.full_name.as_deref().map(|fqsn| (s, fqsn)))
        else {
            tracing::debug!("no stack follows {}, nothing to unset", ctx.stack.name);
            return Ok(());
        };

        // A purged stack must not be recreated just to unset a key
        if !ctx.lookup.exists(fqsn).await? {
            tracing::info!("{} stack not found, {} left as is", fqsn, NODE_BALANCER_ID_KEY);
            return Ok(());
        }

        let next = ctx.engine.upsert(fqsn, &downstream.path).await?;
        match next.remove_config(NODE_BALANCER_ID_KEY).await {
            Ok(()) => {
                tracing::info!("removed {} from {} stack", NODE_BALANCER_ID_KEY, downstream.name);
                Ok(())
            }
            Err(EngineError::ConfigNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

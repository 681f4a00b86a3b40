//! Lifecycle hooks
//!
//! Hooks are bound by name to a stack's `pre_run` / `post_run` lists and
//! looked up in a [`HookRegistry`] owned by the orchestrator. Names that are
//! not registered are skipped, so hook lists can be assembled without
//! checking what exists.

mod cluster;
mod node_balancer;
mod objects;

pub use cluster::CleanupLke;
pub use node_balancer::{AddNodeBalancerId, RmNodeBalancerId};
pub use objects::DeleteObj;

use crate::engine::{ProvisioningEngine, StackHandle};
use crate::error::{EngineError, HookError};
use crate::lookup::StackLookup;
use crate::platform::PlatformContext;
use crate::stack::Stack;
use aplctl_cloud::{CleanupSettings, ResourceApi};
use aplctl_esc::EnvironmentManager;
use aplctl_objstore::SyncEngineLauncher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

pub const ADD_NODE_BALANCER_ID: &str = "addNodeBalancerId";
pub const RM_NODE_BALANCER_ID: &str = "rmNodeBalancerId";
pub const CLEANUP_LKE: &str = "cleanupLke";
pub const DELETE_OBJ: &str = "deleteObj";

/// Stack config / environment key holding the cluster id
pub const LKE_ID_KEY: &str = "lkeId";

/// Stack config key the load balancer id is written under
pub const NODE_BALANCER_ID_KEY: &str = "nodebalancer-id";

/// Collaborators hooks drive
pub struct HookServices {
    pub resources: Arc<dyn ResourceApi>,
    pub environment: EnvironmentManager,
    pub object_store: Arc<dyn SyncEngineLauncher>,
    pub platform: PlatformContext,
    pub cleanup: CleanupSettings,
}

/// Everything a hook sees about the stack it runs for
pub struct HookContext<'a> {
    pub stack: &'a Stack,
    pub handle: &'a dyn StackHandle,
    pub engine: &'a dyn ProvisioningEngine,
    pub lookup: &'a dyn StackLookup,
    /// The stack after this one in ascending priority, if any
    pub downstream: Option<&'a Stack>,
    pub services: &'a HookServices,
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn run(&self, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// Name -> hook mapping, built once per orchestrator
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four platform hooks
    pub fn standard() -> Self {
        Self::new()
            .with(ADD_NODE_BALANCER_ID, AddNodeBalancerId)
            .with(RM_NODE_BALANCER_ID, RmNodeBalancerId)
            .with(CLEANUP_LKE, CleanupLke)
            .with(DELETE_OBJ, DeleteObj)
    }

    pub fn with(mut self, name: impl Into<String>, hook: impl Hook + 'static) -> Self {
        self.register(name, hook);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, hook: impl Hook + 'static) {
        self.hooks.insert(name.into(), Arc::new(hook));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Run the named hook. Returns `false` without doing anything when no
    /// hook is registered under `name`.
    pub async fn dispatch(&self, name: &str, ctx: &HookContext<'_>) -> Result<bool, HookError> {
        let Some(hook) = self.hooks.get(name) else {
            tracing::debug!("no hook registered as {}, skipping", name);
            return Ok(false);
        };
        hook.run(ctx).await?;
        Ok(true)
    }
}

/// Cluster id from stack config, falling back to the environment when the
/// key is already gone from stack state.
pub(crate) async fn cluster_id(ctx: &HookContext<'_>) -> Result<u64, HookError> {
    let raw = match ctx.handle.get_config(LKE_ID_KEY).await {
        Ok(raw) => raw,
        Err(EngineError::ConfigNotFound(_)) => {
            tracing::info!(
                "{} not in {} stack state, reading it from the environment",
                LKE_ID_KEY,
                ctx.stack.name
            );
            let value = ctx.services.environment.read(LKE_ID_KEY).await?;
            return value
                .as_integer()
                .and_then(|n| u64::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid_cluster_id(&format!("{:?}", value)));
        }
        Err(e) => return Err(e.into()),
    };

    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid_cluster_id(&raw))
}

fn invalid_cluster_id(raw: &str) -> HookError {
    HookError::InvalidValue {
        key: LKE_ID_KEY.to_string(),
        reason: format!("not a cluster id: {}", raw),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::fake::{FakeEngine, FakeLookup};
    use aplctl_cloud::fake::FakeResourceApi;
    use aplctl_esc::EnvironmentId;
    use aplctl_esc::fake::FakeEnvironmentApi;
    use aplctl_objstore::fake::FakeLauncher;

    pub struct Fixture {
        pub engine: Arc<FakeEngine>,
        pub lookup: Arc<FakeLookup>,
        pub resources: Arc<FakeResourceApi>,
        pub environment: Arc<FakeEnvironmentApi>,
        pub objects: Arc<FakeLauncher>,
    }

    pub fn platform() -> PlatformContext {
        PlatformContext {
            org: "acme".into(),
            name: "demo".into(),
            region: "nl-ams".into(),
            stage: "dev".into(),
        }
    }

    pub fn env_id() -> EnvironmentId {
        platform().environment_id()
    }

    impl Fixture {
        pub fn new() -> Self {
            Self {
                engine: Arc::new(FakeEngine::new()),
                lookup: Arc::new(FakeLookup::new()),
                resources: Arc::new(FakeResourceApi::new()),
                environment: Arc::new(FakeEnvironmentApi::new()),
                objects: Arc::new(FakeLauncher::new()),
            }
        }

        pub fn with_lookup(mut self, lookup: FakeLookup) -> Self {
            self.lookup = Arc::new(lookup);
            self
        }

        pub fn with_resources(mut self, resources: FakeResourceApi) -> Self {
            self.resources = Arc::new(resources);
            self
        }

        pub fn with_environment(mut self, environment: FakeEnvironmentApi) -> Self {
            self.environment = Arc::new(environment);
            self
        }

        pub fn with_objects(mut self, objects: FakeLauncher) -> Self {
            self.objects = Arc::new(objects);
            self
        }

        pub fn services(&self) -> HookServices {
            HookServices {
                resources: self.resources.clone(),
                environment: EnvironmentManager::new(self.environment.clone(), env_id()),
                object_store: self.objects.clone(),
                platform: platform(),
                cleanup: CleanupSettings::immediate(),
            }
        }
    }
}

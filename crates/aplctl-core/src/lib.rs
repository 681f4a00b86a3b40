//! aplctl core
//!
//! Stack lifecycle orchestration for a platform made of ordered stacks
//! (`infra`, then `apl`), with named lifecycle hooks that pass values
//! between stacks and clean up cloud resources the engine leaves behind.
//!
//! ```text
//!   StackCollection ──► Orchestrator ──► ProvisioningEngine (pulumi CLI)
//!                           │   │
//!                           │   └──► StackLookup (hosted state API)
//!                           ▼
//!                      HookRegistry ──► ResourceApi / EnvironmentManager /
//!                                       SyncEngineLauncher
//! ```

pub mod engine;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod fake;
pub mod hooks;
pub mod lookup;
pub mod orchestrator;
pub mod platform;
pub mod pulumi;
pub mod stack;
pub mod value;

pub use engine::{DestroyOptions, Outputs, ProvisioningEngine, StackHandle, UpOptions};
pub use error::{EngineError, HookError, OrchestratorError, Result, StackError};
pub use hooks::{Hook, HookContext, HookRegistry, HookServices};
pub use lookup::{PulumiCloudLookup, StackLookup};
pub use orchestrator::{Orchestrator, Phase, RunReport, StackOutcome, StackStatus};
pub use platform::PlatformContext;
pub use pulumi::{PulumiCli, PulumiStack};
pub use stack::{APL, INFRA, Order, Stack, StackCollection};
pub use value::OutputValue;

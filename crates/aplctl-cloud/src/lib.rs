//! aplctl cloud resources
//!
//! Provider-neutral access to the cloud resources that the provisioning
//! engine leaves behind when a managed Kubernetes cluster is torn down:
//! block storage volumes and load balancers (NodeBalancers on Linode).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │             aplctl-core hooks                    │
//! │        (cleanupLke / rmNodeBalancerId)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                aplctl-cloud                      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ResourceApi { ... }               │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ ClusterReaper│  │ CleanupReport│            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼─────────────┐
//! │ aplctl-cloud-linode │
//! └─────────────────────┘
//! ```

pub mod error;
#[cfg(feature = "test-utils")]
pub mod fake;
pub mod provider;
pub mod reconcile;
pub mod report;

// Re-exports
pub use error::{CloudError, Result};
pub use provider::{NodeBalancer, ResourceApi, RetryConfig, Volume};
pub use reconcile::{CleanupSettings, ClusterReaper, cluster_label};
pub use report::{CleanupReport, StepResult};

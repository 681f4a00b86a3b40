//! Secrets/config environments for aplctl
//!
//! An environment is a remote YAML document identified by
//! `<org>/<project>/<name>` with two layers:
//!
//! - `pulumiConfig`: provider config exposed to stacks, interpolation capable
//! - free-form values, plain or wrapped with [`secret`]
//!
//! # Example
//!
//! ```ignore
//! use aplctl_esc::{EnvironmentId, EnvironmentManager, EscClient, EscConfig, secret};
//! use std::sync::Arc;
//!
//! let api = Arc::new(EscClient::new(EscConfig::from_env()?));
//! let env = EnvironmentManager::new(api, EnvironmentId::new("acme", "demo", "dev"));
//!
//! env.create().await?;
//! let lke_id = env.read("lkeId").await?;
//! ```

pub mod api;
pub mod client;
pub mod definition;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod fake;
pub mod manager;

pub use api::{EnvironmentApi, Property};
pub use client::{EscClient, EscConfig};
pub use definition::{EnvironmentDefinition, EnvironmentId, SECRET_MARKER, is_secret, secret};
pub use error::{EscError, Result};
pub use manager::{EnvValue, EnvironmentManager};

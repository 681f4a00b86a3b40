//! Linode provider for aplctl
//!
//! Implements [`aplctl_cloud::ResourceApi`] against the Linode v4 REST API.
//!
//! # Requirements
//!
//! - `LINODE_TOKEN` env var holding a personal access token with
//!   read/write scope for volumes, NodeBalancers and LKE
//!
//! # Example
//!
//! ```ignore
//! use aplctl_cloud::{ClusterReaper, RetryConfig};
//! use aplctl_cloud_linode::{LinodeClient, LinodeConfig};
//!
//! let client = LinodeClient::new(LinodeConfig::from_env()?);
//! let report = ClusterReaper::new(&client, "demo-volume")
//!     .purge_cluster_resources(123)
//!     .await?;
//! ```

pub mod client;
pub mod error;

pub use client::{LinodeClient, LinodeConfig};
pub use error::{LinodeError, Result};

//! Object storage purger for aplctl
//!
//! Empties (or removes) the S3-compatible buckets of a platform through
//! rclone's remote-control API. Buckets that do not exist are skipped.
//!
//! # Requirements
//!
//! - `rclone` on `PATH`, or `RCLONE_BINARY` pointing at it

pub mod engine;
pub mod error;
#[cfg(feature = "test-utils")]
pub mod fake;
pub mod purger;
pub mod rclone;
pub mod remote;

pub use engine::{RpcReply, SyncEngine, SyncEngineLauncher};
pub use error::{ObjectStoreError, Result};
pub use purger::{BucketAction, BucketOutcome, ObjectStorePurger, PurgeReport};
pub use rclone::{RcloneLauncher, RcloneRc, StartupWait};
pub use remote::S3Remote;

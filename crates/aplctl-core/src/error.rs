//! Core error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors resolving a stack's fully-qualified name
#[derive(Error, Debug)]
pub enum StackError {
    #[error("read {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("yaml unmarshal {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("project name in {0} is empty")]
    EmptyProjectName(PathBuf),

    #[error("full name of {0} has not been resolved")]
    NotResolved(String),
}

/// Provisioning engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pulumi not found. Please install: curl -fsSL https://get.pulumi.com | sh")]
    CliNotFound,

    #[error("configuration key '{0}' not found in stack state")]
    ConfigNotFound(String),

    #[error("pulumi {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("stack lookup failed: {0}")]
    Lookup(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Hook errors
#[derive(Error, Debug)]
pub enum HookError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Cloud(#[from] aplctl_cloud::CloudError),

    #[error(transparent)]
    Environment(#[from] aplctl_esc::EscError),

    #[error(transparent)]
    ObjectStore(#[from] aplctl_objstore::ObjectStoreError),

    #[error("unable to find {0} in output")]
    MissingOutput(String),

    #[error("{key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("no stack follows {0} to receive its outputs")]
    NoDownstream(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Orchestrator errors; each names the stack and the step that failed
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("unknown target stack \"{0}\"")]
    UnknownTarget(String),

    #[error("{stack}: get fully qualified stack name: {source}")]
    Unresolved { stack: String, source: StackError },

    #[error("{stack}: {phase}: {source}")]
    Engine {
        stack: String,
        phase: crate::orchestrator::Phase,
        source: EngineError,
    },

    #[error("{stack}: hook {hook}: {source}")]
    Hook {
        stack: String,
        hook: String,
        source: HookError,
    },
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

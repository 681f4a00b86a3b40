//! Linode provider error types

use aplctl_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinodeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Linode API error (status {status}): {reason}")]
    Api { status: u16, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Volume {0} is not attached")]
    NotAttached(u64),

    #[error("Linode authentication failed: {0}")]
    Unauthorized(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LinodeError>;

impl From<LinodeError> for CloudError {
    fn from(err: LinodeError) -> Self {
        match err {
            LinodeError::Http(e) => CloudError::Transport(e.to_string()),
            LinodeError::Api { status, reason } => CloudError::Api {
                status,
                message: reason,
            },
            LinodeError::NotFound(what) => CloudError::ResourceNotFound(what),
            LinodeError::NotAttached(id) => CloudError::NotAttached(id),
            LinodeError::Unauthorized(msg) => CloudError::AuthenticationFailed(msg),
            LinodeError::MissingEnvVar(var) => CloudError::MissingEnvVar(var),
            LinodeError::JsonError(e) => CloudError::Json(e),
        }
    }
}

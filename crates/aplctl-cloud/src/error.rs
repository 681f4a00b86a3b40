//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Volume {0} is not attached")]
    NotAttached(u64),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// The resource is already gone; cleanup treats this as satisfied.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CloudError::ResourceNotFound(_) | CloudError::Api { status: 404, .. }
        )
    }

    /// Detaching a volume that is already detached (or gone) needs no action.
    pub fn is_already_detached(&self) -> bool {
        matches!(
            self,
            CloudError::NotAttached(_) | CloudError::ResourceNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(CloudError::ResourceNotFound("lke 1".into()).is_not_found());
        assert!(!CloudError::NotAttached(1).is_not_found());
        assert!(
            CloudError::Api {
                status: 404,
                message: "Not found".into()
            }
            .is_not_found()
        );
        assert!(CloudError::NotAttached(1).is_already_detached());
        assert!(
            !CloudError::Api {
                status: 401,
                message: "Invalid Token".into()
            }
            .is_already_detached()
        );
    }
}

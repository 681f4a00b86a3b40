//! Environment error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EscError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ESC API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("ESC authentication failed: {0}")]
    Unauthorized(String),

    #[error("Environment not found: {0}")]
    NotFound(String),

    #[error("Environment already exists: {0}")]
    Conflict(String),

    #[error("\"{0}\" not found")]
    KeyNotFound(String),

    #[error("\"{0}\" is a secret and cannot be read as config")]
    SecretValue(String),

    #[error("\"{key}\" has unexpected type {found} (wants string or integer)")]
    UnexpectedType { key: String, found: &'static str },

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EscError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EscError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, EscError>;

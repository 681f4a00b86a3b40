//! Object store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("missing one or more required field values ({0})")]
    MissingField(String),

    #[error("rclone not found ({0}). Please install: https://rclone.org/install/")]
    EngineNotFound(String),

    #[error("rclone daemon failed to start: {0}")]
    EngineStartFailed(String),

    #[error("{method} failed: status {status}, response: {body}")]
    Rpc {
        method: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

//! Cloud provider error types

use std::time::Duration;
use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Network failure, throttling or a server-side error. Safe to retry.
    #[error("Transient API error: {0}")]
    Transient(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timed out after {waited:?} waiting for {resource} to settle")]
    Timeout { resource: String, waited: Duration },

    #[error("Settle check failed for {resource}: {reason}")]
    SettleFailed { resource: String, reason: String },

    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether a poll loop may fetch again after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

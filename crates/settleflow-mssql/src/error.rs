//! SQL virtual machine resource error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MssqlError {
    #[error("Invalid resource id {id}: {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed for {resource}:\n  - {}", .errors.join("\n  - "))]
    Validation {
        resource: String,
        errors: Vec<String>,
    },

    #[error("Unexpected value for {field}: {value:?}")]
    UnexpectedValue { field: String, value: String },

    #[error("{operation} of {resource} did not finish within {timeout:?}")]
    OperationTimeout {
        operation: &'static str,
        resource: String,
        timeout: std::time::Duration,
    },

    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] settleflow_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, MssqlError>;

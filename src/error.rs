use std::time::Duration;
use thiserror::Error;

use crate::capability::CapabilityKind;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request rejected: {0}")]
    Precondition(#[from] PreconditionFailure),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Required {0} capability is unavailable: {1}")]
    CapabilityRequired(CapabilityKind, String),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),
    #[error("Analysis was cancelled")]
    Cancelled,
    #[error("Report service error: {0}")]
    Service(String),
}

// Rejections raised before any stage runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionFailure {
    #[error("no image was supplied")]
    MissingImage,
    #[error("image has an empty dimension ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

// Stage-local errors, always recovered into an absent result plus a warning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("{0} capability is unavailable: {1}")]
    Unavailable(CapabilityKind, String),
    #[error("{0}")]
    Failure(String),
}

impl StageError {
    pub fn failure(detail: impl Into<String>) -> Self {
        StageError::Failure(detail.into())
    }
}

impl From<lopdf::Error> for StageError {
    fn from(err: lopdf::Error) -> Self {
        StageError::Failure(format!("PDF serialization failed: {}", err))
    }
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::Failure(format!("I/O failure: {}", err))
    }
}

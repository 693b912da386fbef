//! Error types for the PlantDoc diagnosis pipeline
//!
//! Transport and malformed-reply failures are recovered inside the
//! pipeline into degraded results; only reference and input errors
//! surface to callers.

use thiserror::Error;

use crate::diagnosis::DiagnosisId;

/// Main error type for the diagnosis pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Remote model unreachable, rate-limited, or returned a non-success status
    #[error("Model transport failed: {0}")]
    Transport(String),

    /// Hard timeout on the remote call
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Model reply was not the expected structured format
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    /// Feedback referenced a diagnosis id unknown to storage
    #[error("Unknown diagnosis: {0}")]
    UnknownDiagnosis(DiagnosisId),

    /// Caller-supplied image bytes rejected before any remote call
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Pipeline error: {0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors to PipelineError
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Generic(err.to_string())
    }
}

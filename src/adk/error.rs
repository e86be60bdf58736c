// SPDX-License-Identifier: MIT

//! Typed error handling for sentinel-rs
//!
//! Errors are split by who is allowed to see them. `ClassificationError`
//! never leaves the triage step, `ResponseError` surfaces through
//! `WorkflowError`, and `SentinelError` is what the host binary deals with.

use thiserror::Error;

/// Top-level error type for sentinel-rs
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Configuration errors (missing env vars, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow engine errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Model construction or invocation errors outside a workflow step
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the workflow engine to the caller of a run
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The responder failed; there is no safe default reply
    #[error("General response failed: {0}")]
    Response(#[from] ResponseError),

    /// No snapshot is held under the given resume token
    #[error("Unknown resume token: {0}")]
    UnknownResumeToken(String),

    /// The pending step of a snapshot does not accept resume input
    #[error("Step '{step}' cannot be resumed")]
    NotResumable { step: String },

    /// The run visited more steps than the configured limit
    #[error("Step limit reached: {limit}")]
    StepLimitExceeded { limit: u32 },

    /// The checkpoint store rejected a save or lookup
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Non-success HTTP status from the provider
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Provider refused to answer (safety filters)
    #[error("Response blocked: {0}")]
    Blocked(String),

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure of the classifier capability. Recovered locally by triage.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Classifier timed out")]
    Timeout,

    #[error("Classifier returned no result")]
    EmptyResult,

    #[error("Malformed classification: {0}")]
    Malformed(String),
}

/// Failure of the responder capability. Propagates out of the run.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Responder timed out")]
    Timeout,

    #[error("Responder returned an empty reply")]
    EmptyReply,
}

impl SentinelError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<String> for SentinelError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for SentinelError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl ClassificationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_error_wraps_into_workflow_error() {
        let err: WorkflowError = ResponseError::Timeout.into();
        assert!(matches!(err, WorkflowError::Response(ResponseError::Timeout)));
        assert_eq!(err.to_string(), "General response failed: Responder timed out");
    }

    #[test]
    fn test_workflow_error_wraps_into_sentinel_error() {
        let err: SentinelError = WorkflowError::UnknownResumeToken("abc".to_string()).into();
        assert_eq!(err.to_string(), "Workflow error: Unknown resume token: abc");
    }

    #[test]
    fn test_model_error_display() {
        let err = ModelError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "API error (500): boom");

        let err: ClassificationError = err.into();
        assert_eq!(err.to_string(), "API error (500): boom");
    }

    #[test]
    fn test_string_conversions() {
        let err: SentinelError = "plain".into();
        assert!(matches!(err, SentinelError::Other(ref s) if s == "plain"));
    }
}

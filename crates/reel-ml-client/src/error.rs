//! Model gateway error types.

use thiserror::Error;

/// Result type for gateway operations.
pub type MlResult<T> = Result<T, MlError>;

/// Errors that can occur talking to the model gateway.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The gateway answered with a failure. The remote message is
    /// preserved verbatim.
    #[error("Gateway request failed: {0}")]
    RequestFailed(String),

    /// The gateway answered, but the payload shape is not one we accept.
    /// Always fatal to the stage that produced it.
    #[error("Invalid gateway payload: {0}")]
    InvalidPayload(String),

    /// Reading an invocation result object from storage failed.
    #[error("Result storage error: {0}")]
    ResultStorage(String),

    /// The invocation did not reach a terminal state within the wait
    /// budget. Distinct from `RequestFailed`: the service never errored,
    /// we gave up.
    #[error("Invocation timed out after {0} seconds")]
    Timeout(u64),
}

impl MlError {
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::RequestFailed(message.into())
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MlError::Network(_) | MlError::ResultStorage(_))
    }
}

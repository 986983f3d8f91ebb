//! Vector store error types.

use reel_models::Dimension;
use thiserror::Error;

/// Result type for vector store operations.
pub type VectorResult<T> = Result<T, VectorError>;

/// Errors that can occur in the vector store.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Malformed embedding: empty, all zeros, or below the component floor.
    /// Never retried; it signals an upstream embedding failure.
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    #[error("Unsupported dimension: {0} (supported: 256, 384, 1024, 3072)")]
    UnsupportedDimension(usize),

    #[error("Query vector dimension ({query}) doesn't match target dimension ({target})")]
    DimensionMismatch { query: usize, target: Dimension },

    /// Durable persistence failed; the insert was rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl VectorError {
    pub fn invalid_vector(message: impl Into<String>) -> Self {
        Self::InvalidVector(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

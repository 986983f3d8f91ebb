//! Worker error types.
//!
//! The taxonomy callers see:
//! - validation errors are rejected immediately and never retried
//! - upstream service errors surface the remote message
//! - data integrity errors are fatal to the stage that produced them
//! - timeouts are distinct from upstream failures
//! - resource errors keep the underlying tool's diagnostics verbatim

use thiserror::Error;

use reel_ml_client::MlError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Malformed input: bad dimension, empty file, unsupported type.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external model service failed.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// A corrupted or incomplete upstream result (empty or all-zero
    /// vector, missing expected result fields).
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// A wall-clock budget ran out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// The analysis text yielded zero labeled highlight points.
    #[error("No highlight points extracted from analysis")]
    NoPointsExtracted,

    /// Matching selected zero segments overall.
    #[error("No matching segments found for any highlight point")]
    NoMatchesFound,

    /// An unknown job ID was queried.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Media error: {0}")]
    Media(#[from] reel_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("Vector store error: {0}")]
    Vector(#[from] reel_vector::VectorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity(message.into())
    }
}

impl From<MlError> for WorkerError {
    fn from(e: MlError) -> Self {
        match e {
            MlError::Timeout(secs) => WorkerError::Timeout(secs),
            MlError::InvalidPayload(message) => WorkerError::DataIntegrity(message),
            other => WorkerError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ml_error_mapping() {
        assert!(matches!(
            WorkerError::from(MlError::Timeout(1800)),
            WorkerError::Timeout(1800)
        ));
        assert!(matches!(
            WorkerError::from(MlError::InvalidPayload("bad".into())),
            WorkerError::DataIntegrity(_)
        ));
        assert!(matches!(
            WorkerError::from(MlError::RequestFailed("boom".into())),
            WorkerError::Upstream(_)
        ));
    }
}

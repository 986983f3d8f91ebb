//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    /// Create a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an upload failure error.
    pub fn upload_failed(message: impl Into<String>) -> Self {
        Self::UploadFailed(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Create a delete failure error.
    pub fn delete_failed(message: impl Into<String>) -> Self {
        Self::DeleteFailed(message.into())
    }
}

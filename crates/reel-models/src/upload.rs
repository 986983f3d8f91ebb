//! Upload ingestion job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Dimension, JobId, JobStatus, Modality};

/// State of one asynchronous upload-embedding job.
///
/// Text and image uploads embed synchronously and never create one of
/// these; video and audio uploads register a record here and a watcher
/// task drives it to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    /// Job ID (also used as the vector ID on success)
    pub id: JobId,

    /// Original filename of the upload
    pub filename: String,

    /// Content modality
    pub modality: Modality,

    /// Requested embedding dimension
    pub dimension: Dimension,

    /// Object-storage URL of the uploaded content
    pub storage_url: String,

    /// Optional companion text supplied with the upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Handle of the dispatched async embedding invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation: Option<String>,

    /// Current status
    pub status: JobStatus,

    /// Number of valid segment embeddings combined into the stored vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments_processed: Option<usize>,

    /// Human-readable failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl UploadJob {
    /// Create a new processing record for a dispatched invocation.
    pub fn new(
        id: JobId,
        filename: impl Into<String>,
        modality: Modality,
        dimension: Dimension,
        storage_url: impl Into<String>,
        text: Option<String>,
        invocation: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename: filename.into(),
            modality,
            dimension,
            storage_url: storage_url.into(),
            text,
            invocation: Some(invocation.into()),
            status: JobStatus::Processing,
            segments_processed: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the job completed with the number of combined segments.
    pub fn complete(&mut self, segments: usize) {
        self.status = JobStatus::Completed;
        self.segments_processed = Some(segments);
        self.updated_at = Utc::now();
    }

    /// Mark the job failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_job_lifecycle() {
        let mut job = UploadJob::new(
            JobId::new(),
            "clip.mp4",
            Modality::Video,
            Dimension::D1024,
            "s3://bucket/video/abc_clip.mp4",
            None,
            "invocation-1",
        );
        assert_eq!(job.status, JobStatus::Processing);

        job.complete(7);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.segments_processed, Some(7));
    }
}

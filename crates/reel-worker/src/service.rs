//! Service facade exposed to the request layer.
//!
//! Owns the registries and collaborators (constructed once, shared by
//! reference) and exposes the full caller surface: upload ingestion,
//! similarity search, highlight job submission, status polling, and
//! output download.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use reel_models::{
    Dimension, HighlightJob, JobId, JobStatus, Modality, UploadJob, VectorId,
};
use reel_storage::S3Client;
use reel_vector::{SearchHit, VectorStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::gateway::ModelGateway;
use crate::media_ops::MediaOps;
use crate::pipeline::HighlightPipeline;
use crate::registry::{JobRegistry, UploadRegistry};
use crate::upload::{upload_metadata, validate_embedding, watch_upload_embedding};

/// Video containers accepted for highlight extraction.
const HIGHLIGHT_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "wmv", "mkv", "flv"];

/// Result of an upload submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UploadOutcome {
    /// Text/image uploads embed synchronously; the vector is stored.
    Completed { vector_id: VectorId },
    /// Video/audio uploads run asynchronously; poll with the job id.
    Processing { job_id: JobId },
}

/// A ranked search result set and the dimension it was computed in.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub dimension: Dimension,
}

/// The backend service the web layer talks to.
pub struct HighlightService {
    config: WorkerConfig,
    gateway: Arc<dyn ModelGateway>,
    store: Arc<VectorStore>,
    storage: S3Client,
    pipeline: Arc<HighlightPipeline>,
    highlight_jobs: JobRegistry,
    upload_jobs: UploadRegistry,
}

impl HighlightService {
    pub fn new(
        config: WorkerConfig,
        gateway: Arc<dyn ModelGateway>,
        media: Arc<dyn MediaOps>,
        store: Arc<VectorStore>,
        storage: S3Client,
    ) -> Self {
        let highlight_jobs = JobRegistry::new();
        let pipeline = Arc::new(HighlightPipeline::new(
            highlight_jobs.clone(),
            gateway.clone(),
            media,
            config.clone(),
        ));

        Self {
            config,
            gateway,
            store,
            storage,
            pipeline,
            highlight_jobs,
            upload_jobs: UploadRegistry::new(),
        }
    }

    /// Ingest an uploaded file: embed it and store the vector.
    ///
    /// Text and image complete synchronously. Video and audio return a
    /// job id immediately; a watcher task finishes the work.
    pub async fn submit_upload_job(
        &self,
        path: &Path,
        filename: &str,
        modality: Modality,
        dimension: Dimension,
        text: Option<String>,
    ) -> WorkerResult<UploadOutcome> {
        if filename.is_empty() {
            return Err(WorkerError::validation("No file selected"));
        }
        if !modality.accepts_filename(filename) {
            return Err(WorkerError::validation(format!(
                "File type not allowed for {}: {} (expected one of {:?})",
                modality,
                filename,
                modality.allowed_extensions()
            )));
        }

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| WorkerError::validation(format!("Unreadable upload: {}", e)))?;
        if metadata.len() == 0 {
            return Err(WorkerError::validation("Uploaded file is empty"));
        }

        let file_id = JobId::new();
        let key = format!("uploads/{}/{}_{}", modality, file_id, filename);

        // Storage staging is best-effort for sync modalities: the vector
        // pipeline can proceed with a local reference.
        let storage_url = match self
            .storage
            .upload_file(path, &key, content_type(modality))
            .await
        {
            Ok(()) => self.storage.uri_for(&key),
            Err(e) => {
                warn!("Upload staging failed, keeping local reference: {}", e);
                format!("local://{}", path.display())
            }
        };

        match modality {
            Modality::Text => {
                let content = tokio::fs::read_to_string(path).await?;
                let embedding = self.gateway.embed_text(&content, dimension).await?;
                self.store_upload_vector(&file_id, embedding, filename, modality, &storage_url, text.as_deref())
                    .await?;
                Ok(UploadOutcome::Completed {
                    vector_id: VectorId::from_string(file_id.as_str()),
                })
            }
            Modality::Image => {
                let embedding = self
                    .gateway
                    .embed_media(modality, path, text.as_deref(), dimension)
                    .await?;
                self.store_upload_vector(&file_id, embedding, filename, modality, &storage_url, text.as_deref())
                    .await?;
                Ok(UploadOutcome::Completed {
                    vector_id: VectorId::from_string(file_id.as_str()),
                })
            }
            Modality::Video | Modality::Audio => {
                let handle = self
                    .gateway
                    .start_segmented_embedding(
                        modality,
                        &storage_url,
                        text.as_deref(),
                        dimension,
                        self.config.upload_segment_duration_secs,
                    )
                    .await?;

                let job = UploadJob::new(
                    file_id.clone(),
                    filename,
                    modality,
                    dimension,
                    storage_url.clone(),
                    text.clone(),
                    handle.as_str(),
                );
                self.upload_jobs.insert(job).await;

                info!(job_id = %file_id, "Async upload embedding started ({})", handle);

                let task = watch_upload_embedding(
                    self.gateway.clone(),
                    self.store.clone(),
                    self.upload_jobs.clone(),
                    file_id.clone(),
                    handle,
                    upload_metadata(filename, modality, &storage_url, text.as_deref()),
                );
                tokio::spawn(task);

                Ok(UploadOutcome::Processing { job_id: file_id })
            }
        }
    }

    async fn store_upload_vector(
        &self,
        file_id: &JobId,
        embedding: Vec<f32>,
        filename: &str,
        modality: Modality,
        storage_url: &str,
        text: Option<&str>,
    ) -> WorkerResult<()> {
        validate_embedding(&embedding)?;
        self.store
            .insert(
                VectorId::from_string(file_id.as_str()),
                embedding,
                upload_metadata(filename, modality, storage_url, text),
            )
            .await?;
        info!(job_id = %file_id, "Vector stored for {} upload", modality);
        Ok(())
    }

    /// Status of an async upload job.
    pub async fn upload_status(&self, job_id: &JobId) -> WorkerResult<UploadJob> {
        self.upload_jobs
            .get(job_id)
            .await
            .ok_or_else(|| WorkerError::JobNotFound(job_id.to_string()))
    }

    /// Similarity search over stored vectors.
    ///
    /// When no dimension is given the most populous shard is used
    /// (default 1024 on an empty store).
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        dimension: Option<usize>,
    ) -> WorkerResult<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WorkerError::validation("Query text is required"));
        }

        let dimension = match dimension {
            Some(d) => Dimension::try_from(d)
                .map_err(|e| WorkerError::validation(e.to_string()))?,
            None => self.store.auto_dimension().await,
        };

        let embedding = self.gateway.embed_text(query, dimension).await?;
        let results = self.store.search(&embedding, top_k, Some(dimension)).await?;

        Ok(SearchResponse { results, dimension })
    }

    /// Submit a highlight extraction job. Returns immediately; one worker
    /// task runs the pipeline to completion or failure.
    pub async fn submit_highlight_job(
        &self,
        theme: &str,
        video_path: PathBuf,
        filename: &str,
    ) -> WorkerResult<JobId> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(WorkerError::validation("Highlight theme is required"));
        }

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if !HIGHLIGHT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(WorkerError::validation(format!(
                "Unsupported video format: {} (supported: {})",
                filename,
                HIGHLIGHT_EXTENSIONS.join(", ")
            )));
        }

        tokio::fs::metadata(&video_path)
            .await
            .map_err(|e| WorkerError::validation(format!("Video file not readable: {}", e)))?;

        let work_dir = self
            .config
            .work_dir
            .join("highlights")
            .join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&work_dir).await?;

        let job = HighlightJob::new(theme, video_path, work_dir);
        let job_id = job.id.clone();
        self.highlight_jobs.insert(job).await;

        info!(job_id = %job_id, "Highlight job submitted (theme: {})", theme);

        let pipeline = self.pipeline.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            pipeline.run(spawned_id).await;
        });

        Ok(job_id)
    }

    /// Snapshot of a highlight job.
    pub async fn highlight_status(&self, job_id: &JobId) -> WorkerResult<HighlightJob> {
        self.highlight_jobs
            .get(job_id)
            .await
            .ok_or_else(|| WorkerError::JobNotFound(job_id.to_string()))
    }

    /// Path of the finished highlight video, only once the job completed.
    pub async fn highlight_output(&self, job_id: &JobId) -> WorkerResult<PathBuf> {
        let job = self.highlight_status(job_id).await?;

        if job.status != JobStatus::Completed {
            return Err(WorkerError::validation("Highlight video is not ready yet"));
        }

        let output = job
            .output_path
            .ok_or_else(|| WorkerError::validation("Job has no output video"))?;
        if !output.exists() {
            return Err(WorkerError::validation("Output video file is missing"));
        }

        Ok(output)
    }
}

/// Content type used when staging an upload.
fn content_type(modality: Modality) -> &'static str {
    match modality {
        Modality::Text => "text/plain",
        Modality::Image => "image/jpeg",
        Modality::Video => "video/mp4",
        Modality::Audio => "audio/mpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Modality::Video), "video/mp4");
        assert_eq!(content_type(Modality::Text), "text/plain");
    }
}

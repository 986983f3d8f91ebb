//! Upload embedding jobs.
//!
//! Text and image uploads embed synchronously. Video and audio are
//! delegated to the async segmented embedding API: one watcher task per
//! job polls the invocation, averages the per-window vectors into a
//! single embedding, and stores it.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use reel_ml_client::InvocationHandle;
use reel_models::{JobId, Modality, VectorId};
use reel_vector::VectorStore;

use crate::error::{WorkerError, WorkerResult};
use crate::gateway::ModelGateway;
use crate::registry::UploadRegistry;

/// Reject embeddings that signal upstream failure rather than content.
pub fn validate_embedding(embedding: &[f32]) -> WorkerResult<()> {
    if embedding.is_empty() || embedding.iter().all(|&x| x == 0.0) {
        return Err(WorkerError::data_integrity(
            "Generated embedding is empty or all zeros",
        ));
    }
    Ok(())
}

/// Metadata stored alongside an uploaded vector.
pub fn upload_metadata(
    filename: &str,
    modality: Modality,
    storage_url: &str,
    text: Option<&str>,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("filename".into(), Value::String(filename.to_string()));
    metadata.insert("file_type".into(), Value::String(modality.as_str().to_string()));
    metadata.insert("storage_url".into(), Value::String(storage_url.to_string()));
    metadata.insert(
        "text".into(),
        Value::String(text.unwrap_or_default().to_string()),
    );
    metadata
}

/// Watcher task body for one async upload job.
///
/// Drives the invocation to a terminal state and reflects the outcome in
/// the registry; the job is never left `Processing` forever.
pub async fn watch_upload_embedding(
    gateway: Arc<dyn ModelGateway>,
    store: Arc<VectorStore>,
    registry: UploadRegistry,
    job_id: JobId,
    handle: InvocationHandle,
    mut metadata: Map<String, Value>,
) {
    match gateway.await_combined_embedding(&handle).await {
        Ok((embedding, segments)) => {
            if let Err(e) = validate_embedding(&embedding) {
                warn!(job_id = %job_id, "Combined embedding invalid: {}", e);
                registry.update(&job_id, |job| job.fail(e.to_string())).await;
                return;
            }

            metadata.insert("async_processed".into(), Value::Bool(true));
            metadata.insert("segments".into(), Value::from(segments));

            match store
                .insert(VectorId::from_string(job_id.as_str()), embedding, metadata)
                .await
            {
                Ok(()) => {
                    info!(job_id = %job_id, "Upload embedding stored ({} segments)", segments);
                    registry.update(&job_id, |job| job.complete(segments)).await;
                }
                Err(e) => {
                    warn!(job_id = %job_id, "Vector storage failed: {}", e);
                    registry
                        .update(&job_id, |job| {
                            job.fail(format!("Vector storage failed: {}", e))
                        })
                        .await;
                }
            }
        }
        Err(e) => {
            warn!(job_id = %job_id, "Async embedding failed: {}", e);
            registry.update(&job_id, |job| job.fail(e.to_string())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reel_models::{Dimension, JobStatus, UploadJob};
    use reel_vector::{VectorBackend, VectorResult};
    use reel_models::VectorRecord;
    use std::path::{Path, PathBuf};

    struct MemoryBackend(std::sync::Mutex<Vec<VectorRecord>>);

    #[async_trait]
    impl VectorBackend for MemoryBackend {
        async fn put_record(&self, record: &VectorRecord) -> VectorResult<()> {
            self.0.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn load_dimension(&self, dimension: Dimension) -> VectorResult<Vec<VectorRecord>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.dimension == dimension)
                .cloned()
                .collect())
        }

        async fn count(&self, dimension: Dimension) -> VectorResult<usize> {
            Ok(self.load_dimension(dimension).await?.len())
        }
    }

    struct CombinedGateway {
        outcome: WorkerResult<(Vec<f32>, usize)>,
    }

    #[async_trait]
    impl crate::gateway::ModelGateway for CombinedGateway {
        async fn complete(&self, _prompt: &str) -> WorkerResult<String> {
            unreachable!()
        }
        async fn analyze_video(&self, _video: &Path, _prompt: &str) -> WorkerResult<String> {
            unreachable!()
        }
        async fn embed_text(&self, _text: &str, _dimension: Dimension) -> WorkerResult<Vec<f32>> {
            unreachable!()
        }
        async fn embed_media(
            &self,
            _modality: Modality,
            _path: &Path,
            _text: Option<&str>,
            _dimension: Dimension,
        ) -> WorkerResult<Vec<f32>> {
            unreachable!()
        }
        async fn segment_embed_video(
            &self,
            _video: &Path,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<Vec<Vec<f32>>> {
            unreachable!()
        }
        async fn start_segmented_embedding(
            &self,
            _modality: Modality,
            _object_uri: &str,
            _text: Option<&str>,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<InvocationHandle> {
            unreachable!()
        }
        async fn await_combined_embedding(
            &self,
            _handle: &InvocationHandle,
        ) -> WorkerResult<(Vec<f32>, usize)> {
            match &self.outcome {
                Ok(v) => Ok(v.clone()),
                Err(e) => Err(WorkerError::upstream(e.to_string())),
            }
        }
    }

    fn upload_job() -> UploadJob {
        UploadJob::new(
            JobId::new(),
            "clip.mp4",
            Modality::Video,
            Dimension::D256,
            "s3://bucket/uploads/video/x_clip.mp4",
            None,
            "inv-1",
        )
    }

    async fn run_watcher(outcome: WorkerResult<(Vec<f32>, usize)>) -> (UploadJob, Arc<VectorStore>) {
        let registry = UploadRegistry::new();
        let job = upload_job();
        let job_id = job.id.clone();
        registry.insert(job).await;

        let store = Arc::new(VectorStore::new(Arc::new(MemoryBackend(
            std::sync::Mutex::new(Vec::new()),
        ))));

        watch_upload_embedding(
            Arc::new(CombinedGateway { outcome }),
            store.clone(),
            registry.clone(),
            job_id.clone(),
            InvocationHandle("inv-1".to_string()),
            upload_metadata("clip.mp4", Modality::Video, "s3://bucket/x", None),
        )
        .await;

        (registry.get(&job_id).await.unwrap(), store)
    }

    #[tokio::test]
    async fn test_watcher_stores_combined_embedding() {
        let embedding: Vec<f32> = (0..256).map(|i| (i as f32 + 1.0) / 256.0).collect();
        let (job, store) = run_watcher(Ok((embedding.clone(), 5))).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.segments_processed, Some(5));

        let hits = store.search(&embedding, 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata["segments"], 5);
        assert_eq!(hits[0].metadata["async_processed"], true);
    }

    #[tokio::test]
    async fn test_watcher_rejects_degenerate_embedding() {
        let (job, _) = run_watcher(Ok((vec![0.0; 256], 3))).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("empty or all zeros"));
    }

    #[tokio::test]
    async fn test_watcher_records_invocation_failure() {
        let (job, _) = run_watcher(Err(WorkerError::Timeout(1800))).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("1800"));
    }

    #[test]
    fn test_validate_embedding() {
        assert!(validate_embedding(&[0.1, 0.0]).is_ok());
        assert!(validate_embedding(&[]).is_err());
        assert!(validate_embedding(&[0.0, 0.0]).is_err());
    }
}

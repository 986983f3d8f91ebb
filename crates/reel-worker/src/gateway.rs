//! Model gateway seam.
//!
//! The pipeline and upload flows talk to the embedding/generative models
//! through this trait. The production implementation decides between
//! inline payloads and object-storage references by content size, and
//! delegates long-running invocations to the async tracker.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, warn};
use uuid::Uuid;

use reel_ml_client::{
    AsyncJobTracker, InvocationHandle, MediaSource, MlClient, TrackerConfig,
};
use reel_models::{Dimension, Modality};
use reel_storage::S3Client;

use crate::error::WorkerResult;

/// Model operations the worker needs.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Text-only generative completion.
    async fn complete(&self, prompt: &str) -> WorkerResult<String>;

    /// Vision completion over a video.
    async fn analyze_video(&self, video: &Path, prompt: &str) -> WorkerResult<String>;

    /// Embed a piece of text.
    async fn embed_text(&self, text: &str, dimension: Dimension) -> WorkerResult<Vec<f32>>;

    /// Embed a media file synchronously (image, short audio/video).
    async fn embed_media(
        &self,
        modality: Modality,
        path: &Path,
        text: Option<&str>,
        dimension: Dimension,
    ) -> WorkerResult<Vec<f32>>;

    /// One embedding per fixed-duration window of a video, as a single
    /// atomic operation (segmentation is never re-derived locally).
    async fn segment_embed_video(
        &self,
        video: &Path,
        dimension: Dimension,
        segment_duration: u32,
    ) -> WorkerResult<Vec<Vec<f32>>>;

    /// Dispatch an async segmented embedding for already-uploaded content.
    async fn start_segmented_embedding(
        &self,
        modality: Modality,
        object_uri: &str,
        text: Option<&str>,
        dimension: Dimension,
        segment_duration: u32,
    ) -> WorkerResult<InvocationHandle>;

    /// Wait for an async invocation and combine its segment vectors.
    /// Returns the combined vector and the count it was averaged from.
    async fn await_combined_embedding(
        &self,
        handle: &InvocationHandle,
    ) -> WorkerResult<(Vec<f32>, usize)>;
}

/// Production gateway backed by the ML HTTP client and object storage.
pub struct GatewayClient {
    ml: Arc<MlClient>,
    storage: S3Client,
    tracker: AsyncJobTracker,
    /// Content at or below this size is sent inline as base64
    inline_limit_mb: f64,
}

impl GatewayClient {
    pub fn new(
        ml: Arc<MlClient>,
        storage: S3Client,
        tracker_config: TrackerConfig,
        inline_limit_mb: f64,
    ) -> Self {
        let tracker = AsyncJobTracker::new(ml.clone(), tracker_config);
        Self {
            ml,
            storage,
            tracker,
            inline_limit_mb,
        }
    }

    async fn file_size_mb(path: &Path) -> WorkerResult<f64> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(metadata.len() as f64 / (1024.0 * 1024.0))
    }

    async fn inline_source(path: &Path) -> WorkerResult<MediaSource> {
        let bytes = tokio::fs::read(path).await?;
        Ok(MediaSource::Inline {
            data: BASE64.encode(bytes),
        })
    }

    /// Stage a file as a temporary object for by-reference model calls.
    async fn stage_temp_object(&self, path: &Path) -> WorkerResult<(String, String)> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());
        let key = format!("videos/temp/{}_{}", Uuid::new_v4(), filename);

        self.storage.upload_file(path, &key, "video/mp4").await?;
        let uri = self.storage.uri_for(&key);
        debug!("Staged {} as {}", path.display(), uri);

        Ok((key, uri))
    }

    async fn remove_temp_object(&self, key: &str) {
        if let Err(e) = self.storage.delete_object(key).await {
            warn!("Failed to remove temporary object {}: {}", key, e);
        }
    }
}

#[async_trait]
impl ModelGateway for GatewayClient {
    async fn complete(&self, prompt: &str) -> WorkerResult<String> {
        Ok(self.ml.complete(prompt, None).await?)
    }

    async fn analyze_video(&self, video: &Path, prompt: &str) -> WorkerResult<String> {
        let size_mb = Self::file_size_mb(video).await?;

        if size_mb < self.inline_limit_mb {
            debug!("Analyzing {} inline ({:.2} MB)", video.display(), size_mb);
            let media = Self::inline_source(video).await?;
            return Ok(self.ml.complete(prompt, Some(media)).await?);
        }

        debug!(
            "Analyzing {} by reference ({:.2} MB)",
            video.display(),
            size_mb
        );
        let (key, uri) = self.stage_temp_object(video).await?;
        let result = self
            .ml
            .complete(prompt, Some(MediaSource::ObjectUri { uri }))
            .await;
        self.remove_temp_object(&key).await;

        Ok(result?)
    }

    async fn embed_text(&self, text: &str, dimension: Dimension) -> WorkerResult<Vec<f32>> {
        Ok(self.ml.embed_text(text, dimension.size()).await?)
    }

    async fn embed_media(
        &self,
        modality: Modality,
        path: &Path,
        text: Option<&str>,
        dimension: Dimension,
    ) -> WorkerResult<Vec<f32>> {
        let media = Self::inline_source(path).await?;
        Ok(self
            .ml
            .embed_media(modality, media, text, dimension.size())
            .await?)
    }

    async fn segment_embed_video(
        &self,
        video: &Path,
        dimension: Dimension,
        segment_duration: u32,
    ) -> WorkerResult<Vec<Vec<f32>>> {
        let size_mb = Self::file_size_mb(video).await?;

        if size_mb < self.inline_limit_mb {
            debug!(
                "Segment-embedding {} inline ({:.2} MB, {}s windows)",
                video.display(),
                size_mb,
                segment_duration
            );
            let media = Self::inline_source(video).await?;
            return Ok(self
                .ml
                .segment_embed(Modality::Video, media, dimension.size(), segment_duration)
                .await?);
        }

        debug!(
            "Segment-embedding {} via async invocation ({:.2} MB)",
            video.display(),
            size_mb
        );
        let (key, uri) = self.stage_temp_object(video).await?;
        let handle = match self
            .ml
            .start_async_embedding(Modality::Video, &uri, None, dimension.size(), segment_duration)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                self.remove_temp_object(&key).await;
                return Err(e.into());
            }
        };

        let result = self.tracker.watch(&handle).await;
        self.remove_temp_object(&key).await;

        Ok(result?)
    }

    async fn start_segmented_embedding(
        &self,
        modality: Modality,
        object_uri: &str,
        text: Option<&str>,
        dimension: Dimension,
        segment_duration: u32,
    ) -> WorkerResult<InvocationHandle> {
        Ok(self
            .ml
            .start_async_embedding(modality, object_uri, text, dimension.size(), segment_duration)
            .await?)
    }

    async fn await_combined_embedding(
        &self,
        handle: &InvocationHandle,
    ) -> WorkerResult<(Vec<f32>, usize)> {
        Ok(self.tracker.watch_combined(handle).await?)
    }
}

//! Media toolkit seam.
//!
//! The pipeline drives ffmpeg through this trait so orchestration can be
//! exercised without a transcoder on PATH.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use reel_media::{CompressionPolicy, MediaInfo};

use crate::error::WorkerResult;

/// Media operations the pipeline needs.
#[async_trait]
pub trait MediaOps: Send + Sync {
    /// Probe duration and size.
    async fn probe(&self, path: &Path) -> WorkerResult<MediaInfo>;

    /// Duration in seconds, 0.0 when probing fails.
    async fn duration(&self, path: &Path) -> f64;

    /// Conditionally compress; returns the path later stages should use.
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        policy: CompressionPolicy,
    ) -> WorkerResult<PathBuf>;

    /// Extract one clip from a source video.
    async fn extract_clip(
        &self,
        source: &Path,
        output: &Path,
        start_offset: f64,
        duration: f64,
    ) -> WorkerResult<()>;

    /// Stitch clips (fades + concatenation) into the final output.
    async fn stitch(&self, clips: &[PathBuf], output: &Path, fade_duration: f64)
        -> WorkerResult<()>;
}

/// Production toolkit backed by ffmpeg/ffprobe subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegMedia;

#[async_trait]
impl MediaOps for FfmpegMedia {
    async fn probe(&self, path: &Path) -> WorkerResult<MediaInfo> {
        Ok(reel_media::probe_media(path).await?)
    }

    async fn duration(&self, path: &Path) -> f64 {
        reel_media::get_duration(path).await
    }

    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        policy: CompressionPolicy,
    ) -> WorkerResult<PathBuf> {
        Ok(reel_media::compress_to_target(input, output, policy).await?)
    }

    async fn extract_clip(
        &self,
        source: &Path,
        output: &Path,
        start_offset: f64,
        duration: f64,
    ) -> WorkerResult<()> {
        Ok(reel_media::extract_clip(source, output, start_offset, duration).await?)
    }

    async fn stitch(
        &self,
        clips: &[PathBuf],
        output: &Path,
        fade_duration: f64,
    ) -> WorkerResult<()> {
        Ok(reel_media::stitch_highlights(clips, output, fade_duration).await?)
    }
}

//! Conditional video compression.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::{run_ffmpeg, FfmpegCommand};
use crate::error::MediaResult;
use crate::probe::probe_media;

/// Size thresholds driving the compression decision.
#[derive(Debug, Clone, Copy)]
pub struct CompressionPolicy {
    /// Files at or below this size are used as-is
    pub skip_below_mb: f64,
    /// Files above this size are compressed down to it
    pub target_mb: f64,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            skip_below_mb: 25.0,
            target_mb: 100.0,
        }
    }
}

/// Target video bitrate in kbps for a file compressed to `target_mb` over
/// `duration` seconds, leaving room for a 128k audio track.
pub fn target_bitrate_kbps(target_mb: f64, duration: f64) -> i64 {
    ((target_mb * 8.0 * 1024.0) / duration) as i64 - 128
}

/// Compress a video to the policy's target size when it is large enough to
/// need it.
///
/// Strategy:
/// 1. At or below `skip_below_mb`: use the input unchanged.
/// 2. At or below `target_mb`: also unchanged, re-encoding would only
///    grow or degrade it.
/// 3. Above `target_mb`: re-encode at a bitrate derived from the target
///    size and the duration.
///
/// Returns the path to use for the following stages. Compression failure
/// falls back to the input rather than failing the caller.
pub async fn compress_to_target(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    policy: CompressionPolicy,
) -> MediaResult<PathBuf> {
    let input = input.as_ref();
    let output = output.as_ref();

    let info = probe_media(input).await?;
    let size_mb = info.size_mb();

    info!(
        "Source video: {:.2} MB, {:.2}s duration",
        size_mb, info.duration
    );

    if size_mb <= policy.skip_below_mb {
        info!("Small file ({:.2} MB), skipping compression", size_mb);
        return Ok(input.to_path_buf());
    }

    if size_mb <= policy.target_mb {
        info!(
            "File already within target ({:.2} MB <= {:.0} MB), skipping compression",
            size_mb, policy.target_mb
        );
        return Ok(input.to_path_buf());
    }

    let bitrate = target_bitrate_kbps(policy.target_mb, info.duration);
    info!(
        "Compressing {:.2} MB -> {:.0} MB at {} kbps",
        size_mb, policy.target_mb, bitrate
    );

    let cmd = FfmpegCommand::new(input, output)
        .video_codec("libx264")
        .video_bitrate(bitrate)
        .preset("medium")
        .audio_codec("aac")
        .audio_bitrate("128k")
        .faststart();

    if let Err(e) = run_ffmpeg(&cmd, None).await {
        warn!("Compression failed, using original: {}", e);
        return Ok(input.to_path_buf());
    }

    if !output.exists() {
        warn!("Compressed output missing, using original");
        return Ok(input.to_path_buf());
    }

    let compressed = probe_media(output).await?;
    info!(
        "Compression complete: {:.2} MB ({:.1}% reduction)",
        compressed.size_mb(),
        (1.0 - compressed.size_mb() / size_mb) * 100.0
    );

    Ok(output.to_path_buf())
}

//! Clip extraction, fades, and concatenation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::command::{run_ffmpeg, FfmpegCommand};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Where a clip sits in the stitched sequence; decides its fades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipPosition {
    /// First clip: fade in only
    First,
    /// Interior clip: fade in and out
    Middle,
    /// Last clip: fade out only
    Last,
}

impl ClipPosition {
    /// Position of clip `index` in a sequence of `total` clips.
    pub fn of(index: usize, total: usize) -> Self {
        if index == 0 {
            ClipPosition::First
        } else if index + 1 == total {
            ClipPosition::Last
        } else {
            ClipPosition::Middle
        }
    }
}

/// Extract a time range from a source video as a standalone clip.
///
/// Re-encodes with a tight keyframe interval so the clip cuts cleanly and
/// concatenates without artifacts.
pub async fn extract_clip(
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_offset: f64,
    duration: f64,
) -> MediaResult<()> {
    let source = source.as_ref();
    let output = output.as_ref();

    debug!(
        "Extracting clip: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        source.display(),
        output.display(),
        start_offset,
        duration
    );

    let cmd = FfmpegCommand::new(source, output)
        .seek(start_offset)
        .duration(duration)
        .video_codec("libx264")
        .preset("medium")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("128k")
        .keyframe_interval(30);

    run_ffmpeg(&cmd, None).await
}

/// Video and audio fade filters for a clip at the given position.
///
/// The first clip only fades in, the last only fades out, interior clips
/// do both. Fade-out starts `fade_duration` before the clip ends.
pub fn build_fade_filters(
    position: ClipPosition,
    clip_duration: f64,
    fade_duration: f64,
) -> (String, String) {
    let fade_out_start = (clip_duration - fade_duration).max(0.0);

    let fade_in = format!("fade=t=in:st=0:d={}", fade_duration);
    let fade_out = format!("fade=t=out:st={}:d={}", fade_out_start, fade_duration);
    let afade_in = format!("afade=t=in:st=0:d={}", fade_duration);
    let afade_out = format!("afade=t=out:st={}:d={}", fade_out_start, fade_duration);

    match position {
        ClipPosition::First => (fade_in, afade_in),
        ClipPosition::Last => (fade_out, afade_out),
        ClipPosition::Middle => (
            format!("{},{}", fade_in, fade_out),
            format!("{},{}", afade_in, afade_out),
        ),
    }
}

/// Re-encode a clip with its positional fade-in/out applied.
pub async fn apply_fades(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    position: ClipPosition,
    fade_duration: f64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let clip_duration = get_duration(input).await;
    let (video_filter, audio_filter) = build_fade_filters(position, clip_duration, fade_duration);

    debug!("Applying fades to {}: {}", input.display(), video_filter);

    let cmd = FfmpegCommand::new(input, output)
        .video_filter(video_filter)
        .audio_filter(audio_filter)
        .video_codec("libx264")
        .preset("medium")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("192k");

    run_ffmpeg(&cmd, None).await
}

/// The `concat` filter graph for `n` audio+video inputs.
pub fn build_concat_filter(n: usize) -> String {
    let mut filter = String::new();
    for i in 0..n {
        filter.push_str(&format!("[{}:v][{}:a]", i, i));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=1[vout][aout]", n));
    filter
}

/// Concatenate clips into one output with a single multi-input invocation.
pub async fn concat_clips(inputs: &[PathBuf], output: impl AsRef<Path>) -> MediaResult<()> {
    let output = output.as_ref();

    if inputs.is_empty() {
        return Err(MediaError::InvalidVideo("no clips to concatenate".to_string()));
    }

    debug!("Concatenating {} clips into {}", inputs.len(), output.display());

    let cmd = FfmpegCommand::with_inputs(inputs, output)
        .filter_complex(build_concat_filter(inputs.len()))
        .map("[vout]")
        .map("[aout]")
        .video_codec("libx264")
        .preset("medium")
        .crf(23)
        .audio_codec("aac")
        .audio_bitrate("192k")
        .faststart();

    run_ffmpeg(&cmd, None).await
}

/// Stitch selected clips into the final highlight video.
///
/// Each clip gets its positional fades, then everything is concatenated.
/// A single clip bypasses both steps with a plain copy. Faded
/// intermediates are removed afterwards, best-effort.
pub async fn stitch_highlights(
    clips: &[PathBuf],
    output: impl AsRef<Path>,
    fade_duration: f64,
) -> MediaResult<()> {
    let output = output.as_ref();

    if clips.is_empty() {
        return Err(MediaError::InvalidVideo("no clips to stitch".to_string()));
    }

    if clips.len() == 1 {
        info!("Single clip, copying directly to {}", output.display());
        tokio::fs::copy(&clips[0], output).await?;
        return Ok(());
    }

    info!("Stitching {} clips into {}", clips.len(), output.display());

    let work_dir = clips[0]
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut faded = Vec::with_capacity(clips.len());
    for (i, clip) in clips.iter().enumerate() {
        let faded_path = work_dir.join(format!("faded_{:04}.mp4", i));
        let position = ClipPosition::of(i, clips.len());
        apply_fades(clip, &faded_path, position, fade_duration).await?;
        faded.push(faded_path);
    }

    let result = concat_clips(&faded, output).await;

    for path in &faded {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove faded intermediate {}: {}", path.display(), e);
        }
    }

    result?;
    info!("Highlight video written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_position() {
        assert_eq!(ClipPosition::of(0, 3), ClipPosition::First);
        assert_eq!(ClipPosition::of(1, 3), ClipPosition::Middle);
        assert_eq!(ClipPosition::of(2, 3), ClipPosition::Last);
        // A two-clip sequence has no middle.
        assert_eq!(ClipPosition::of(0, 2), ClipPosition::First);
        assert_eq!(ClipPosition::of(1, 2), ClipPosition::Last);
    }

    #[test]
    fn test_fade_filters_first() {
        let (video, audio) = build_fade_filters(ClipPosition::First, 3.0, 0.5);
        assert_eq!(video, "fade=t=in:st=0:d=0.5");
        assert_eq!(audio, "afade=t=in:st=0:d=0.5");
    }

    #[test]
    fn test_fade_filters_last() {
        let (video, audio) = build_fade_filters(ClipPosition::Last, 3.0, 0.5);
        assert_eq!(video, "fade=t=out:st=2.5:d=0.5");
        assert_eq!(audio, "afade=t=out:st=2.5:d=0.5");
    }

    #[test]
    fn test_fade_filters_middle_has_both() {
        let (video, _) = build_fade_filters(ClipPosition::Middle, 3.0, 0.5);
        assert!(video.contains("fade=t=in"));
        assert!(video.contains("fade=t=out:st=2.5"));
    }

    #[test]
    fn test_fade_out_start_clamped() {
        let (video, _) = build_fade_filters(ClipPosition::Last, 0.2, 0.5);
        assert!(video.contains("st=0:"));
    }

    #[test]
    fn test_concat_filter() {
        assert_eq!(
            build_concat_filter(2),
            "[0:v][0:a][1:v][1:a]concat=n=2:v=1:a=1[vout][aout]"
        );
    }
}

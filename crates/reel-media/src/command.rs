//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for FFmpeg commands.
///
/// Supports one or more inputs (concatenation needs several) and a single
/// output. Arguments keep their insertion order.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file paths
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Arguments placed before the first -i
    input_args: Vec<String>,
    /// Arguments placed after the inputs
    output_args: Vec<String>,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![input.as_ref().to_path_buf()],
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Create a command with several inputs (for concatenation).
    pub fn with_inputs<I, P>(inputs: I, output: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            inputs: inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add an argument before the inputs.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an argument after the inputs.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set audio filter.
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream into the output.
    pub fn map(self, stream: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(stream)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set encoder preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set target video bitrate in kbps, with matching maxrate/bufsize.
    pub fn video_bitrate(self, kbps: i64) -> Self {
        self.output_arg("-b:v")
            .output_arg(format!("{}k", kbps))
            .output_arg("-maxrate")
            .output_arg(format!("{}k", (kbps as f64 * 1.5) as i64))
            .output_arg("-bufsize")
            .output_arg(format!("{}k", kbps * 2))
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Force a keyframe every N frames.
    pub fn keyframe_interval(self, frames: u32) -> Self {
        self.output_arg("-g").output_arg(frames.to_string())
    }

    /// Move the moov atom to the front for streaming playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Build the full argument list.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-v".to_string(), self.log_level.clone()];

        args.extend(self.input_args.clone());

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Run an FFmpeg command to completion.
///
/// Stderr is captured and preserved verbatim on failure. When `timeout` is
/// given the process is killed after it elapses; by default the wait is
/// unbounded.
pub async fn run_ffmpeg(cmd: &FfmpegCommand, timeout: Option<Duration>) -> MediaResult<()> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let args = cmd.build_args();
    debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("FFmpeg timed out after {:?}, killing process", limit);
                return Err(MediaError::Timeout(limit.as_secs()));
            }
        },
        None => child.wait_with_output().await?,
    };

    if output.status.success() {
        Ok(())
    } else {
        Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ))
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

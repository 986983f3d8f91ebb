//! FFprobe media information.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Duration and size of a media file.
#[derive(Debug, Clone, Copy)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
}

impl MediaInfo {
    /// File size in megabytes.
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

/// Probe a media file for duration and size.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=size,duration",
            "-of",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let duration = probe
        .format
        .duration
        .as_ref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .size
        .as_ref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(MediaInfo { duration, size })
}

/// Get media duration in seconds, 0.0 when probing fails.
pub async fn get_duration(path: impl AsRef<Path>) -> f64 {
    match probe_media(path).await {
        Ok(info) => info.duration,
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mb() {
        let info = MediaInfo {
            duration: 10.0,
            size: 25 * 1024 * 1024,
        };
        assert!((info.size_mb() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_probe_output_parse() {
        let json = r#"{"format":{"duration":"30.500000","size":"1048576"}}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.format.duration.as_deref(), Some("30.500000"));
        assert_eq!(probe.format.size.as_deref(), Some("1048576"));
    }
}

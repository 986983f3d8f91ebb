//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_media::CompressionPolicy;

/// Worker configuration.
///
/// Matching knobs (threshold, per-point top-k, overlap window) are
/// job-configurable here rather than hardcoded in the engine.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Minimum similarity for a segment to match a highlight point
    pub similarity_threshold: f32,
    /// Best segments kept per highlight point
    pub top_k_per_point: usize,
    /// Segments starting within this window of an accepted one overlap it
    pub overlap_window_secs: f64,
    /// Segment window for highlight jobs, in seconds
    pub segment_duration_secs: u32,
    /// Segment window for upload embedding jobs, in seconds
    pub upload_segment_duration_secs: u32,
    /// Content at or below this size is sent to the gateway inline
    pub inline_limit_mb: f64,
    /// Compression thresholds for stage 2
    pub compression: CompressionPolicy,
    /// Per-clip fade in/out length, in seconds
    pub fade_duration_secs: f64,
    /// Async invocation poll interval
    pub poll_interval: Duration,
    /// Async invocation wait budget
    pub max_wait: Duration,
    /// Root directory for per-job scratch space
    pub work_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.05,
            top_k_per_point: 3,
            overlap_window_secs: 3.0,
            segment_duration_secs: 3,
            upload_segment_duration_secs: 5,
            inline_limit_mb: 25.0,
            compression: CompressionPolicy::default(),
            fade_duration_secs: 0.5,
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(1800),
            work_dir: PathBuf::from("/tmp/reel"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            similarity_threshold: env_parse("REEL_SIMILARITY_THRESHOLD", defaults.similarity_threshold),
            top_k_per_point: env_parse("REEL_TOP_K_PER_POINT", defaults.top_k_per_point),
            overlap_window_secs: env_parse("REEL_OVERLAP_WINDOW_SECS", defaults.overlap_window_secs),
            segment_duration_secs: env_parse("REEL_SEGMENT_DURATION_SECS", defaults.segment_duration_secs),
            upload_segment_duration_secs: env_parse(
                "REEL_UPLOAD_SEGMENT_DURATION_SECS",
                defaults.upload_segment_duration_secs,
            ),
            inline_limit_mb: env_parse("REEL_INLINE_LIMIT_MB", defaults.inline_limit_mb),
            compression: CompressionPolicy {
                skip_below_mb: env_parse("REEL_COMPRESS_SKIP_BELOW_MB", defaults.compression.skip_below_mb),
                target_mb: env_parse("REEL_COMPRESS_TARGET_MB", defaults.compression.target_mb),
            },
            fade_duration_secs: env_parse("REEL_FADE_DURATION_SECS", defaults.fade_duration_secs),
            poll_interval: Duration::from_secs(env_parse("REEL_POLL_INTERVAL_SECS", 10)),
            max_wait: Duration::from_secs(env_parse("REEL_MAX_WAIT_SECS", 1800)),
            work_dir: std::env::var("REEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert!((config.similarity_threshold - 0.05).abs() < 1e-6);
        assert_eq!(config.top_k_per_point, 3);
        assert!((config.overlap_window_secs - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.segment_duration_secs, 3);
        assert_eq!(config.upload_segment_duration_secs, 5);
        assert_eq!(config.max_wait, Duration::from_secs(1800));
    }
}

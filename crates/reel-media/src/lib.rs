//! Media operations for the Reel backend.
//!
//! Everything here shells out to ffmpeg/ffprobe. Subprocess diagnostics
//! are preserved verbatim in errors for operability.

pub mod clip;
pub mod command;
pub mod compress;
pub mod error;
pub mod probe;

pub use clip::{apply_fades, concat_clips, extract_clip, stitch_highlights, ClipPosition};
pub use command::{check_ffmpeg, check_ffprobe, run_ffmpeg, FfmpegCommand};
pub use compress::{compress_to_target, CompressionPolicy};
pub use error::{MediaError, MediaResult};
pub use probe::{get_duration, probe_media, MediaInfo};

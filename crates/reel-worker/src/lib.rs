//! Highlight extraction worker.
//!
//! This crate provides:
//! - The six-stage highlight pipeline and its job registry
//! - Semantic matching of highlight points to embedded segments
//! - Upload embedding jobs (sync text/image, async video/audio)
//! - The service facade the request layer talks to

pub mod config;
pub mod criteria;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod matching;
pub mod media_ops;
pub mod pipeline;
pub mod points;
pub mod registry;
pub mod service;
pub mod upload;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use gateway::{GatewayClient, ModelGateway};
pub use matching::{MatchingConfig, MatchingEngine};
pub use media_ops::{FfmpegMedia, MediaOps};
pub use pipeline::HighlightPipeline;
pub use registry::{JobRegistry, UploadRegistry};
pub use service::{HighlightService, SearchResponse, UploadOutcome};

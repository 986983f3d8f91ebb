//! Shared data models for the Reel highlight backend.
//!
//! This crate provides Serde-serializable types for:
//! - Embedding dimensions and vector records
//! - Segment candidates and clip matches
//! - Highlight pipeline jobs and upload ingestion jobs
//! - Content modalities and upload validation

pub mod dimension;
pub mod highlight;
pub mod job;
pub mod modality;
pub mod segment;
pub mod upload;
pub mod vector;

// Re-export common types
pub use dimension::{Dimension, DimensionError};
pub use highlight::{HighlightJob, PipelineStep, SelectedClip};
pub use job::{JobId, JobStatus};
pub use modality::Modality;
pub use segment::{ClipMatch, SegmentCandidate};
pub use upload::UploadJob;
pub use vector::{VectorId, VectorRecord};

//! Segment candidates produced by segmentation and the matches selected
//! from them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A fixed-duration slice of a source video, before it is known whether it
/// will be selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentCandidate {
    /// Path of the video this segment was cut from
    pub source: PathBuf,

    /// Offset of the segment start within the source, in seconds
    pub start_offset: f64,

    /// Segment length in seconds
    pub duration: f64,

    /// Zero-based position of the segment within the source
    pub index: usize,

    /// Embedding for this segment; `None` until the embedding stage
    /// succeeds for it
    pub embedding: Option<Vec<f32>>,

    /// Extracted clip file; `None` until the segment is selected by
    /// matching (clips are materialized lazily)
    pub clip_path: Option<PathBuf>,
}

impl SegmentCandidate {
    /// Create a candidate at `index * duration` with no embedding yet.
    pub fn new(source: impl Into<PathBuf>, index: usize, duration: f64) -> Self {
        Self {
            source: source.into(),
            start_offset: index as f64 * duration,
            duration,
            index,
            embedding: None,
            clip_path: None,
        }
    }

    /// Whether the embedding stage produced a vector for this segment.
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// A segment selected for one highlight point.
///
/// Ephemeral: produced by the matching engine and consumed immediately by
/// deduplication and stitching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipMatch {
    /// The matched segment
    pub segment: SegmentCandidate,

    /// The highlight point text this segment matched
    pub point: String,

    /// Cosine similarity between the point and the segment embedding
    pub similarity: f32,

    /// Position among the top-k matches for this point (0 = best)
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_offsets() {
        let seg = SegmentCandidate::new("/tmp/in.mp4", 4, 3.0);
        assert!((seg.start_offset - 12.0).abs() < f64::EPSILON);
        assert!(!seg.has_embedding());
        assert!(seg.clip_path.is_none());
    }
}

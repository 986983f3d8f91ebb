//! Semantic matching of highlight points to embedded segments.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use reel_models::{ClipMatch, Dimension, SegmentCandidate};
use reel_vector::cosine_similarity;

use crate::error::{WorkerError, WorkerResult};
use crate::gateway::ModelGateway;
use crate::points::parse_highlight_points;

/// Matching knobs, carried in [`crate::WorkerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    /// Minimum similarity for a segment to count as a match
    pub similarity_threshold: f32,
    /// Best segments kept per highlight point
    pub top_k_per_point: usize,
    /// Segments starting within this window of an accepted one overlap it
    pub overlap_window_secs: f64,
}

/// Turns highlight points and embedded candidates into a deduplicated,
/// time-ordered selection.
pub struct MatchingEngine {
    gateway: Arc<dyn ModelGateway>,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(gateway: Arc<dyn ModelGateway>, config: MatchingConfig) -> Self {
        Self { gateway, config }
    }

    /// Select the best candidate segments for the analysis text.
    ///
    /// Each point independently keeps its top-k candidates above the
    /// threshold, so one point may contribute several clips and one clip
    /// may be selected by several points. The merged selection is then
    /// deduplicated exactly (by segment index) and temporally (keeping
    /// the higher similarity inside the overlap window).
    ///
    /// An embedding failure for one point only costs that point its
    /// matches; zero selected segments overall is an error.
    pub async fn select_clips(
        &self,
        analysis: &str,
        candidates: &[SegmentCandidate],
        dimension: Dimension,
    ) -> WorkerResult<Vec<ClipMatch>> {
        let points = parse_highlight_points(analysis)?;
        info!("Extracted {} highlight points", points.len());

        let valid: Vec<&SegmentCandidate> =
            candidates.iter().filter(|c| c.has_embedding()).collect();
        info!("Valid segments: {}/{}", valid.len(), candidates.len());

        let mut selected: Vec<ClipMatch> = Vec::new();

        for point in &points {
            debug!("Matching point: {:.80}", point.text);

            let query = match self.gateway.embed_text(&point.text, dimension).await {
                Ok(query) => query,
                Err(e) => {
                    warn!("Embedding failed for point {}: {}", point.label, e);
                    continue;
                }
            };

            let mut scored: Vec<(f32, &SegmentCandidate)> = valid
                .iter()
                .filter_map(|candidate| {
                    let embedding = candidate.embedding.as_ref()?;
                    let similarity = cosine_similarity(&query, embedding);
                    if similarity.is_finite() && similarity > self.config.similarity_threshold {
                        Some((similarity, *candidate))
                    } else {
                        None
                    }
                })
                .collect();

            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(self.config.top_k_per_point);

            if scored.is_empty() {
                debug!(
                    "No segment above threshold {} for point {}",
                    self.config.similarity_threshold, point.label
                );
            }

            for (rank, (similarity, candidate)) in scored.into_iter().enumerate() {
                debug!(
                    "Selected segment {} (offset {:.1}s, similarity {:.3})",
                    candidate.index, candidate.start_offset, similarity
                );
                selected.push(ClipMatch {
                    segment: (*candidate).clone(),
                    point: point.text.clone(),
                    similarity,
                    rank,
                });
            }
        }

        // Time order, then exact dedup, then overlap resolution.
        selected.sort_by(|a, b| {
            a.segment
                .start_offset
                .partial_cmp(&b.segment.start_offset)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let unique = dedup_exact(selected);
        let filtered = resolve_overlaps(unique, self.config.overlap_window_secs);

        if filtered.is_empty() {
            return Err(WorkerError::NoMatchesFound);
        }

        info!("Selected {} segments after deduplication", filtered.len());
        Ok(filtered)
    }
}

/// Drop repeats of a segment index, keeping the earliest accepted match.
fn dedup_exact(matches: Vec<ClipMatch>) -> Vec<ClipMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.segment.index))
        .collect()
}

/// Resolve temporal overlap, scanning in start-offset order.
///
/// A segment starting within `window` seconds of an already-accepted one
/// overlaps it; the higher similarity wins. The accepted set is re-sorted
/// by start offset after each substitution.
fn resolve_overlaps(matches: Vec<ClipMatch>, window: f64) -> Vec<ClipMatch> {
    let mut accepted: Vec<ClipMatch> = Vec::new();

    for candidate in matches {
        let overlapping = accepted.iter().position(|kept| {
            (candidate.segment.start_offset - kept.segment.start_offset).abs() < window
        });

        match overlapping {
            Some(i) => {
                if candidate.similarity > accepted[i].similarity {
                    debug!(
                        "Replacing overlapping segment {} ({:.3}) with {} ({:.3})",
                        accepted[i].segment.index,
                        accepted[i].similarity,
                        candidate.segment.index,
                        candidate.similarity
                    );
                    accepted.remove(i);
                    accepted.push(candidate);
                    accepted.sort_by(|a, b| {
                        a.segment
                            .start_offset
                            .partial_cmp(&b.segment.start_offset)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                }
            }
            None => accepted.push(candidate),
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reel_ml_client::InvocationHandle;
    use reel_models::Modality;
    use std::path::{Path, PathBuf};

    /// Gateway stub whose text embeddings are a fixed unit vector, so a
    /// candidate embedding `[s, sqrt(1 - s^2)]` has cosine similarity `s`.
    struct FixedEmbedGateway {
        fail_embeds: bool,
    }

    #[async_trait]
    impl ModelGateway for FixedEmbedGateway {
        async fn complete(&self, _prompt: &str) -> WorkerResult<String> {
            unreachable!("not used by matching")
        }

        async fn analyze_video(&self, _video: &Path, _prompt: &str) -> WorkerResult<String> {
            unreachable!("not used by matching")
        }

        async fn embed_text(&self, _text: &str, _dimension: Dimension) -> WorkerResult<Vec<f32>> {
            if self.fail_embeds {
                Err(WorkerError::upstream("embedding service down"))
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        async fn embed_media(
            &self,
            _modality: Modality,
            _path: &Path,
            _text: Option<&str>,
            _dimension: Dimension,
        ) -> WorkerResult<Vec<f32>> {
            unreachable!("not used by matching")
        }

        async fn segment_embed_video(
            &self,
            _video: &Path,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<Vec<Vec<f32>>> {
            unreachable!("not used by matching")
        }

        async fn start_segmented_embedding(
            &self,
            _modality: Modality,
            _object_uri: &str,
            _text: Option<&str>,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<InvocationHandle> {
            unreachable!("not used by matching")
        }

        async fn await_combined_embedding(
            &self,
            _handle: &InvocationHandle,
        ) -> WorkerResult<(Vec<f32>, usize)> {
            unreachable!("not used by matching")
        }
    }

    fn candidate(index: usize, start_offset: f64, similarity: f32) -> SegmentCandidate {
        SegmentCandidate {
            source: PathBuf::from("/tmp/video.mp4"),
            start_offset,
            duration: 1.0,
            index,
            embedding: Some(vec![similarity, (1.0 - similarity * similarity).sqrt()]),
            clip_path: None,
        }
    }

    fn engine(threshold: f32, top_k: usize, window: f64, fail_embeds: bool) -> MatchingEngine {
        MatchingEngine::new(
            Arc::new(FixedEmbedGateway { fail_embeds }),
            MatchingConfig {
                similarity_threshold: threshold,
                top_k_per_point: top_k,
                overlap_window_secs: window,
            },
        )
    }

    #[tokio::test]
    async fn test_temporal_dedup_scenario() {
        // Candidates at 0s/2s/5s/9s with similarities 0.9/0.95/0.3/0.4 and
        // a 3s window: offset 0 loses to offset 2, offset 5 is below the
        // threshold, offsets 2 and 9 survive.
        let candidates = vec![
            candidate(0, 0.0, 0.9),
            candidate(1, 2.0, 0.95),
            candidate(2, 5.0, 0.3),
            candidate(3, 9.0, 0.4),
        ];

        let result = engine(0.35, 10, 3.0, false)
            .select_clips("A. the decisive moment", &candidates, Dimension::D1024)
            .await
            .unwrap();

        let offsets: Vec<f64> = result.iter().map(|m| m.segment.start_offset).collect();
        assert_eq!(offsets, vec![2.0, 9.0]);
    }

    #[tokio::test]
    async fn test_per_point_top_k() {
        let candidates: Vec<SegmentCandidate> = (0..6)
            .map(|i| candidate(i, i as f64 * 10.0, 0.5 + i as f32 * 0.05))
            .collect();

        let result = engine(0.05, 3, 3.0, false)
            .select_clips("A. one point", &candidates, Dimension::D1024)
            .await
            .unwrap();

        // Only the 3 best survive, and they come back in time order.
        assert_eq!(result.len(), 3);
        let offsets: Vec<f64> = result.iter().map(|m| m.segment.start_offset).collect();
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_candidates_without_embeddings_are_skipped() {
        let mut missing = candidate(0, 0.0, 0.9);
        missing.embedding = None;
        let candidates = vec![missing, candidate(1, 10.0, 0.8)];

        let result = engine(0.05, 3, 3.0, false)
            .select_clips("A. a point", &candidates, Dimension::D1024)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].segment.index, 1);
    }

    #[tokio::test]
    async fn test_unparseable_analysis_is_fatal() {
        let candidates = vec![candidate(0, 0.0, 0.9)];
        let err = engine(0.05, 3, 3.0, false)
            .select_clips("free-form text with no markers", &candidates, Dimension::D1024)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoPointsExtracted));
    }

    #[tokio::test]
    async fn test_total_embedding_failure_is_no_matches() {
        let candidates = vec![candidate(0, 0.0, 0.9)];
        let err = engine(0.05, 3, 3.0, true)
            .select_clips("A. a point\nB. another", &candidates, Dimension::D1024)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoMatchesFound));
    }

    #[test]
    fn test_exact_dedup_keeps_first() {
        let matches = vec![
            ClipMatch {
                segment: candidate(0, 0.0, 0.9),
                point: "A.".into(),
                similarity: 0.9,
                rank: 0,
            },
            ClipMatch {
                segment: candidate(0, 0.0, 0.9),
                point: "B.".into(),
                similarity: 0.8,
                rank: 0,
            },
        ];

        let unique = dedup_exact(matches);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].point, "A.");
    }
}

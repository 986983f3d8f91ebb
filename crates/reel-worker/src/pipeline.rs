//! The six-stage highlight extraction pipeline.
//!
//! Exactly one worker task runs a job, updating its registry record as
//! each stage completes. Any stage error marks the job failed and halts
//! later stages; artifacts recorded by earlier stages stay readable so a
//! caller can see how far the job got.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use reel_models::{Dimension, JobId, PipelineStep, SegmentCandidate, SelectedClip};

use crate::config::WorkerConfig;
use crate::criteria::{analysis_prompt, criteria_prompt, DEFAULT_CRITERIA};
use crate::error::{WorkerError, WorkerResult};
use crate::gateway::ModelGateway;
use crate::matching::{MatchingConfig, MatchingEngine};
use crate::media_ops::MediaOps;
use crate::registry::JobRegistry;

/// Orchestrates one highlight job from criteria generation to stitching.
pub struct HighlightPipeline {
    registry: JobRegistry,
    gateway: Arc<dyn ModelGateway>,
    media: Arc<dyn MediaOps>,
    config: WorkerConfig,
}

impl HighlightPipeline {
    pub fn new(
        registry: JobRegistry,
        gateway: Arc<dyn ModelGateway>,
        media: Arc<dyn MediaOps>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            media,
            config,
        }
    }

    /// Run the job to completion or failure, recording the outcome.
    pub async fn run(&self, job_id: JobId) {
        info!(job_id = %job_id, "Starting highlight job");

        if let Err(e) = self.run_stages(&job_id).await {
            error!(job_id = %job_id, "Highlight job failed: {}", e);
            self.registry
                .update(&job_id, |job| job.fail(e.to_string()))
                .await;
        }
    }

    async fn run_stages(&self, job_id: &JobId) -> WorkerResult<()> {
        let job = self
            .registry
            .get(job_id)
            .await
            .ok_or_else(|| WorkerError::JobNotFound(job_id.to_string()))?;

        let theme = job.theme.clone();
        let video_path = job.video_path.clone();
        let work_dir = job.work_dir.clone();

        // Stage 1: criterion generation. The only stage with a non-fatal
        // fallback: a model failure falls back to the built-in criteria.
        self.registry
            .update(job_id, |job| {
                job.enter_step(PipelineStep::CriteriaGeneration, "Generating highlight criteria...");
                job.set_progress(5);
            })
            .await;

        let criteria = match self.gateway.complete(&criteria_prompt(&theme)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(job_id = %job_id, "Criteria generation failed, using default: {}", e);
                DEFAULT_CRITERIA.to_string()
            }
        };

        info!(job_id = %job_id, "Criteria generated ({} chars)", criteria.len());
        self.registry
            .update(job_id, |job| {
                job.criteria = Some(criteria.clone());
                job.finish_step(PipelineStep::CriteriaGeneration, "Criteria generated", 15);
            })
            .await;

        // Stage 2: conditional compression. A compression failure falls
        // back to the source file rather than failing the job.
        self.registry
            .update(job_id, |job| {
                job.enter_step(PipelineStep::Compression, "Compressing video...");
            })
            .await;

        let compressed_target = work_dir.join("compressed.mp4");
        let working_video = match self
            .media
            .compress(&video_path, &compressed_target, self.config.compression)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!(job_id = %job_id, "Compression failed, using original: {}", e);
                video_path.clone()
            }
        };

        self.registry
            .update(job_id, |job| {
                job.compressed_path = Some(working_video.clone());
                job.finish_step(PipelineStep::Compression, "Compression complete", 25);
            })
            .await;

        // Stage 3: content analysis over the working video.
        self.registry
            .update(job_id, |job| {
                job.enter_step(PipelineStep::Analysis, "Analyzing video content...");
            })
            .await;

        let analysis = self
            .gateway
            .analyze_video(&working_video, &analysis_prompt(&criteria))
            .await?;

        info!(job_id = %job_id, "Analysis complete ({} chars)", analysis.len());
        self.registry
            .update(job_id, |job| {
                job.analysis = Some(analysis.clone());
                job.finish_step(PipelineStep::Analysis, "Video analysis complete", 45);
            })
            .await;

        // Stage 4: joint segmentation + embedding, one atomic external
        // operation per job.
        self.registry
            .update(job_id, |job| {
                job.enter_step(
                    PipelineStep::SegmentEmbedding,
                    "Segmenting video and generating embeddings...",
                );
            })
            .await;

        let embeddings = self
            .gateway
            .segment_embed_video(
                &working_video,
                Dimension::default(),
                self.config.segment_duration_secs,
            )
            .await?;

        let segment_duration = self.config.segment_duration_secs as f64;
        let candidates: Vec<SegmentCandidate> = embeddings
            .into_iter()
            .enumerate()
            .map(|(index, vector)| {
                let mut candidate =
                    SegmentCandidate::new(&working_video, index, segment_duration);
                // An empty or all-zero window embedding marks the segment
                // as having no usable embedding, not a failed job.
                if !vector.is_empty() && vector.iter().any(|&x| x != 0.0) {
                    candidate.embedding = Some(vector);
                }
                candidate
            })
            .collect();

        let embedded = candidates.iter().filter(|c| c.has_embedding()).count();
        info!(
            job_id = %job_id,
            "Segmented {} windows, {} with embeddings",
            candidates.len(),
            embedded
        );
        self.registry
            .update(job_id, |job| {
                job.finish_step(
                    PipelineStep::SegmentEmbedding,
                    format!(
                        "Segmented {} windows, {} embeddings generated",
                        candidates.len(),
                        embedded
                    ),
                    65,
                );
            })
            .await;

        // Stage 5: matching, then lazy materialization of only the
        // selected clips.
        self.registry
            .update(job_id, |job| {
                job.enter_step(PipelineStep::Matching, "Matching highlight segments...");
            })
            .await;

        let engine = MatchingEngine::new(
            self.gateway.clone(),
            MatchingConfig {
                similarity_threshold: self.config.similarity_threshold,
                top_k_per_point: self.config.top_k_per_point,
                overlap_window_secs: self.config.overlap_window_secs,
            },
        );
        let mut matches = engine
            .select_clips(&analysis, &candidates, Dimension::default())
            .await?;

        let clips_dir = work_dir.join("clips");
        tokio::fs::create_dir_all(&clips_dir).await?;

        let mut clip_paths: Vec<PathBuf> = Vec::with_capacity(matches.len());
        let mut summaries: Vec<SelectedClip> = Vec::with_capacity(matches.len());
        for m in matches.iter_mut() {
            let clip_path = clips_dir.join(format!("clip_{:04}.mp4", m.segment.index));
            self.media
                .extract_clip(
                    &m.segment.source,
                    &clip_path,
                    m.segment.start_offset,
                    m.segment.duration,
                )
                .await?;
            m.segment.clip_path = Some(clip_path.clone());
            summaries.push(SelectedClip {
                path: clip_path.clone(),
                start_offset: m.segment.start_offset,
                similarity: m.similarity,
                description: m.point.chars().take(100).collect(),
            });
            clip_paths.push(clip_path);
        }

        let matched = matches.len();
        self.registry
            .update(job_id, |job| {
                job.clips = summaries.clone();
                job.finish_step(
                    PipelineStep::Matching,
                    format!("Matched {} highlight segments", matched),
                    85,
                );
            })
            .await;

        // Stage 6: stitching.
        self.registry
            .update(job_id, |job| {
                job.enter_step(PipelineStep::Stitching, "Stitching highlight video...");
            })
            .await;

        let output_path = work_dir.join("highlight.mp4");
        self.media
            .stitch(&clip_paths, &output_path, self.config.fade_duration_secs)
            .await?;

        let original_duration = self.media.duration(&video_path).await;
        let highlight_duration = self.media.duration(&output_path).await;

        self.registry
            .update(job_id, |job| {
                job.output_path = Some(output_path.clone());
                job.original_duration = Some(original_duration);
                job.highlight_duration = Some(highlight_duration);
                job.finish_step(PipelineStep::Stitching, "Highlight video complete", 100);
                job.complete();
            })
            .await;

        info!(
            job_id = %job_id,
            "Highlight job complete: {} clips, {:.2}s -> {:.2}s",
            matched,
            original_duration,
            highlight_duration
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_ops::MediaOps;
    use async_trait::async_trait;
    use reel_media::{CompressionPolicy, MediaInfo};
    use reel_ml_client::InvocationHandle;
    use reel_models::{HighlightJob, JobStatus, Modality};
    use std::path::Path;

    const ANALYSIS: &str = "\
**Video summary:** a short test video.

**Highlight points:**
A. [priority 1] - The opening move
B. [priority 2] - The midpoint rally
C. [priority 1] - The finale";

    struct StubGateway {
        fail_complete: bool,
        fail_analysis: bool,
        segment_embeddings: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl ModelGateway for StubGateway {
        async fn complete(&self, _prompt: &str) -> WorkerResult<String> {
            if self.fail_complete {
                Err(WorkerError::upstream("criteria model unavailable"))
            } else {
                Ok("## Themed criteria:\n- something specific".to_string())
            }
        }

        async fn analyze_video(&self, _video: &Path, _prompt: &str) -> WorkerResult<String> {
            if self.fail_analysis {
                Err(WorkerError::upstream("vision model unavailable"))
            } else {
                Ok(ANALYSIS.to_string())
            }
        }

        async fn embed_text(&self, _text: &str, _dimension: Dimension) -> WorkerResult<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_media(
            &self,
            _modality: Modality,
            _path: &Path,
            _text: Option<&str>,
            _dimension: Dimension,
        ) -> WorkerResult<Vec<f32>> {
            unreachable!("not used by the pipeline")
        }

        async fn segment_embed_video(
            &self,
            _video: &Path,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<Vec<Vec<f32>>> {
            Ok(self.segment_embeddings.clone())
        }

        async fn start_segmented_embedding(
            &self,
            _modality: Modality,
            _object_uri: &str,
            _text: Option<&str>,
            _dimension: Dimension,
            _segment_duration: u32,
        ) -> WorkerResult<InvocationHandle> {
            unreachable!("not used by the pipeline")
        }

        async fn await_combined_embedding(
            &self,
            _handle: &InvocationHandle,
        ) -> WorkerResult<(Vec<f32>, usize)> {
            unreachable!("not used by the pipeline")
        }
    }

    struct StubMedia;

    #[async_trait]
    impl MediaOps for StubMedia {
        async fn probe(&self, _path: &Path) -> WorkerResult<MediaInfo> {
            Ok(MediaInfo {
                duration: 30.0,
                size: 1024 * 1024,
            })
        }

        async fn duration(&self, _path: &Path) -> f64 {
            30.0
        }

        async fn compress(
            &self,
            input: &Path,
            _output: &Path,
            _policy: CompressionPolicy,
        ) -> WorkerResult<PathBuf> {
            Ok(input.to_path_buf())
        }

        async fn extract_clip(
            &self,
            _source: &Path,
            output: &Path,
            _start_offset: f64,
            _duration: f64,
        ) -> WorkerResult<()> {
            tokio::fs::write(output, b"clip").await?;
            Ok(())
        }

        async fn stitch(
            &self,
            _clips: &[PathBuf],
            output: &Path,
            _fade_duration: f64,
        ) -> WorkerResult<()> {
            tokio::fs::write(output, b"highlight").await?;
            Ok(())
        }
    }

    /// Ten 1-second windows with distinct, well-spread embeddings.
    fn spread_embeddings(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let s = 0.4 + 0.05 * i as f32;
                vec![s, (1.0 - s * s).sqrt()]
            })
            .collect()
    }

    async fn run_pipeline(gateway: StubGateway) -> HighlightJob {
        let work_dir = tempfile::tempdir().unwrap();
        let registry = JobRegistry::new();
        let mut config = WorkerConfig::default();
        config.segment_duration_secs = 1;

        let job = HighlightJob::new(
            "action",
            work_dir.path().join("source.mp4"),
            work_dir.path().to_path_buf(),
        );
        let job_id = job.id.clone();
        registry.insert(job).await;

        let pipeline = HighlightPipeline::new(
            registry.clone(),
            Arc::new(gateway),
            Arc::new(StubMedia),
            config,
        );
        pipeline.run(job_id.clone()).await;

        registry.get(&job_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_criteria_failure_falls_back_to_default() {
        let job = run_pipeline(StubGateway {
            fail_complete: true,
            fail_analysis: false,
            segment_embeddings: spread_embeddings(10),
        })
        .await;

        // The job keeps going on the built-in criteria.
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.criteria.as_deref(), Some(DEFAULT_CRITERIA));
        assert!(!job.clips.is_empty());
    }

    #[tokio::test]
    async fn test_analysis_failure_preserves_earlier_artifacts() {
        let job = run_pipeline(StubGateway {
            fail_complete: false,
            fail_analysis: true,
            segment_embeddings: spread_embeddings(10),
        })
        .await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.current_step, PipelineStep::Analysis);
        assert!(job.criteria.is_some());
        assert!(job.compressed_path.is_some());
        assert!(job.analysis.is_none());
        assert!(job.error.as_deref().unwrap().contains("vision model"));
        // Stage 1 and 2 progress is retained.
        assert_eq!(job.progress, 25);
    }

    #[tokio::test]
    async fn test_empty_segmentation_fails_at_matching() {
        let job = run_pipeline(StubGateway {
            fail_complete: false,
            fail_analysis: false,
            segment_embeddings: vec![vec![0.0, 0.0]; 4],
        })
        .await;

        // All-zero window embeddings leave no valid candidates.
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.current_step, PipelineStep::Matching);
    }
}

//! Highlight extraction job records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    CriteriaGeneration,
    Compression,
    Analysis,
    SegmentEmbedding,
    Matching,
    Stitching,
}

impl PipelineStep {
    /// 1-based step number as shown to callers.
    pub fn number(&self) -> u8 {
        match self {
            PipelineStep::CriteriaGeneration => 1,
            PipelineStep::Compression => 2,
            PipelineStep::Analysis => 3,
            PipelineStep::SegmentEmbedding => 4,
            PipelineStep::Matching => 5,
            PipelineStep::Stitching => 6,
        }
    }
}

/// Summary of one selected clip, exposed through job status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedClip {
    /// Extracted clip file
    pub path: PathBuf,

    /// Start offset within the source video, in seconds
    pub start_offset: f64,

    /// Similarity of the winning point match
    pub similarity: f32,

    /// Truncated text of the highlight point that selected this clip
    pub description: String,
}

/// State of one highlight extraction job.
///
/// Created on submission, mutated by exactly one worker task as stages
/// complete, and read concurrently by status-polling callers. Records are
/// kept for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightJob {
    /// Unique job ID
    pub id: JobId,

    /// Caller-supplied theme driving criterion generation
    pub theme: String,

    /// Current status
    pub status: JobStatus,

    /// Stage currently running (or the stage that failed)
    pub current_step: PipelineStep,

    /// Overall progress, 0-100
    pub progress: u8,

    /// Human-readable message per step number
    pub step_messages: BTreeMap<u8, String>,

    /// Uploaded source video
    pub video_path: PathBuf,

    /// Per-job scratch directory
    pub work_dir: PathBuf,

    /// Stage 1 artifact: the highlight criterion text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,

    /// Stage 2 artifact: the video used by later stages (the compressed
    /// copy, or the source when compression was skipped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_path: Option<PathBuf>,

    /// Stage 3 artifact: the free-text analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,

    /// Stage 5 artifact: the selected clips, in start-offset order
    #[serde(default)]
    pub clips: Vec<SelectedClip>,

    /// Stage 6 artifact: the stitched output video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Duration of the source video in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_duration: Option<f64>,

    /// Duration of the stitched output in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_duration: Option<f64>,

    /// Human-readable failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl HighlightJob {
    /// Create a new job in `Processing` state at step 1.
    pub fn new(theme: impl Into<String>, video_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        let mut step_messages = BTreeMap::new();
        step_messages.insert(1, "Generating highlight criteria...".to_string());
        for step in 2..=6u8 {
            step_messages.insert(step, "Waiting...".to_string());
        }

        Self {
            id: JobId::new(),
            theme: theme.into(),
            status: JobStatus::Processing,
            current_step: PipelineStep::CriteriaGeneration,
            progress: 0,
            step_messages,
            video_path: video_path.into(),
            work_dir: work_dir.into(),
            criteria: None,
            compressed_path: None,
            analysis: None,
            clips: Vec::new(),
            output_path: None,
            original_duration: None,
            highlight_duration: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Enter a stage, replacing its message.
    pub fn enter_step(&mut self, step: PipelineStep, message: impl Into<String>) {
        self.current_step = step;
        self.step_messages.insert(step.number(), message.into());
        self.updated_at = Utc::now();
    }

    /// Record a stage's completion message and overall progress.
    pub fn finish_step(&mut self, step: PipelineStep, message: impl Into<String>, progress: u8) {
        self.step_messages.insert(step.number(), message.into());
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
    }

    /// Update overall progress.
    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
    }

    /// Mark the job as completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed at the current step.
    ///
    /// Artifacts already recorded by earlier stages are retained so a
    /// caller can inspect how far the job got.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_initial_state() {
        let job = HighlightJob::new("action", "/tmp/v.mp4", "/tmp/work");
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.current_step, PipelineStep::CriteriaGeneration);
        assert_eq!(job.progress, 0);
        assert_eq!(job.step_messages.len(), 6);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_fail_retains_artifacts() {
        let mut job = HighlightJob::new("action", "/tmp/v.mp4", "/tmp/work");
        job.criteria = Some("criteria".into());
        job.enter_step(PipelineStep::Analysis, "Analyzing video...");
        job.fail("analysis failed");

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.current_step, PipelineStep::Analysis);
        assert_eq!(job.criteria.as_deref(), Some("criteria"));
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(PipelineStep::CriteriaGeneration.number(), 1);
        assert_eq!(PipelineStep::Stitching.number(), 6);
    }
}

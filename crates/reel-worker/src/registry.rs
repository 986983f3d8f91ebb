//! Shared job registries.
//!
//! The registries are the one structure with concurrent multi-writer and
//! multi-reader access: each worker task writes its own entry, while
//! status-polling callers read arbitrary entries. Reads return snapshots;
//! writes go through short closures so no lock is ever held across an
//! await point.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use reel_models::{HighlightJob, JobId, UploadJob};

/// Registry of highlight jobs, constructed once and shared by reference.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, HighlightJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job.
    pub async fn insert(&self, job: HighlightJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    /// Snapshot of one job.
    pub async fn get(&self, id: &JobId) -> Option<HighlightJob> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Apply a mutation to one job. Returns false for unknown ids.
    pub async fn update<F>(&self, id: &JobId, mutate: F) -> bool
    where
        F: FnOnce(&mut HighlightJob),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }

    /// Number of registered jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

/// Registry of upload embedding jobs.
#[derive(Clone, Default)]
pub struct UploadRegistry {
    jobs: Arc<RwLock<HashMap<JobId, UploadJob>>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: UploadJob) {
        self.jobs.write().await.insert(job.id.clone(), job);
    }

    pub async fn get(&self, id: &JobId) -> Option<UploadJob> {
        self.jobs.read().await.get(id).cloned()
    }

    pub async fn update<F>(&self, id: &JobId, mutate: F) -> bool
    where
        F: FnOnce(&mut UploadJob),
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(id) {
            Some(job) => {
                mutate(job);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::JobStatus;

    #[tokio::test]
    async fn test_update_mutates_in_place() {
        let registry = JobRegistry::new();
        let job = HighlightJob::new("action", "/tmp/v.mp4", "/tmp/work");
        let id = job.id.clone();
        registry.insert(job).await;

        assert!(registry.update(&id, |job| job.fail("boom")).await);

        let snapshot = registry.get(&id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let registry = JobRegistry::new();
        assert!(!registry.update(&JobId::new(), |_| {}).await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = JobRegistry::new();
        let clone = registry.clone();

        let job = HighlightJob::new("action", "/tmp/v.mp4", "/tmp/work");
        let id = job.id.clone();
        registry.insert(job).await;

        assert!(clone.get(&id).await.is_some());
    }
}

//! Watcher for long-running async invocations.
//!
//! One watcher task owns each invocation: it polls status on a ticker
//! until the remote reaches a terminal state or the wait budget runs out.
//! Nothing else mutates the invocation, so the state machine is
//! single-writer by construction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::MlClient;
use crate::error::{MlError, MlResult};
use crate::types::{InvocationHandle, InvocationStatus, RemoteStatus};

/// Local state of a watched invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    /// Dispatched, not yet polled
    Submitted,
    /// Actively polling the remote status
    Polling,
    /// Remote completed and the result was retrieved
    Completed,
    /// Remote reported failure
    Failed,
    /// The wait budget elapsed before a terminal state
    TimedOut,
}

/// Polling contract for async invocations.
///
/// Implemented by the gateway client; stubbed in tests to drive the
/// watcher through specific status sequences.
#[async_trait]
pub trait InvocationPoller: Send + Sync {
    async fn poll_status(&self, handle: &InvocationHandle) -> MlResult<InvocationStatus>;
    async fn fetch_result(&self, handle: &InvocationHandle) -> MlResult<Vec<Vec<f32>>>;
}

#[async_trait]
impl InvocationPoller for MlClient {
    async fn poll_status(&self, handle: &InvocationHandle) -> MlResult<InvocationStatus> {
        MlClient::poll_status(self, handle).await
    }

    async fn fetch_result(&self, handle: &InvocationHandle) -> MlResult<Vec<Vec<f32>>> {
        MlClient::fetch_result(self, handle).await
    }
}

/// Watch configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Interval between status polls
    pub poll_interval: Duration,
    /// Total wait budget before the invocation is abandoned as timed out
    pub max_wait: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(1800),
        }
    }
}

/// Drives async invocations to a terminal state.
pub struct AsyncJobTracker {
    poller: Arc<dyn InvocationPoller>,
    config: TrackerConfig,
}

impl AsyncJobTracker {
    pub fn new(poller: Arc<dyn InvocationPoller>, config: TrackerConfig) -> Self {
        Self { poller, config }
    }

    /// Poll until the invocation completes, then retrieve its segment
    /// vectors.
    ///
    /// - Remote `Failed` propagates the remote failure message verbatim.
    /// - Exceeding the wait budget yields [`MlError::Timeout`], distinct
    ///   from failure so callers can tell "the service gave up" from "the
    ///   service errored".
    /// - A structurally empty result is rejected as an invalid payload.
    pub async fn watch(&self, handle: &InvocationHandle) -> MlResult<Vec<Vec<f32>>> {
        debug!("Watching invocation {} (budget {:?})", handle, self.config.max_wait);

        let outcome = tokio::time::timeout(self.config.max_wait, self.poll_until_terminal(handle))
            .await
            .map_err(|_| {
                warn!("Invocation {} timed out", handle);
                MlError::Timeout(self.config.max_wait.as_secs())
            })?;

        outcome
    }

    async fn poll_until_terminal(&self, handle: &InvocationHandle) -> MlResult<Vec<Vec<f32>>> {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let status = self.poller.poll_status(handle).await?;
            match status.status {
                RemoteStatus::Submitted => {
                    debug!("Invocation {}: {:?}", handle, InvocationState::Polling);
                }
                RemoteStatus::Completed => {
                    info!("Invocation {} completed, fetching result", handle);
                    let segments = self.poller.fetch_result(handle).await?;
                    if segments.is_empty() {
                        return Err(MlError::invalid_payload("no embeddings in result"));
                    }
                    debug!("Invocation {}: {:?}", handle, InvocationState::Completed);
                    return Ok(segments);
                }
                RemoteStatus::Failed => {
                    let message = status
                        .failure_message
                        .unwrap_or_else(|| "Unknown error".to_string());
                    warn!("Invocation {} failed: {}", handle, message);
                    return Err(MlError::request_failed(message));
                }
            }
        }
    }

    /// Watch an invocation and combine its segment vectors into one.
    ///
    /// Returns the combined vector and the number of valid segments it was
    /// averaged from. If no segment is valid the invocation result is
    /// treated as a failure after the fact.
    pub async fn watch_combined(&self, handle: &InvocationHandle) -> MlResult<(Vec<f32>, usize)> {
        let segments = self.watch(handle).await?;
        combine_segment_embeddings(&segments)
            .ok_or_else(|| MlError::invalid_payload("no valid embeddings found in segments"))
    }
}

/// Average the valid (non-empty, not all-zero) segment vectors.
///
/// Returns `None` when no segment is valid, or when the average itself
/// degenerates to all zeros.
pub fn combine_segment_embeddings(segments: &[Vec<f32>]) -> Option<(Vec<f32>, usize)> {
    let mut valid: Vec<&Vec<f32>> = segments
        .iter()
        .filter(|v| !v.is_empty() && v.iter().any(|&x| x != 0.0))
        .collect();

    // Mixed lengths would make component-wise averaging meaningless; keep
    // only vectors matching the first valid one.
    let expected = valid.first()?.len();
    valid.retain(|v| v.len() == expected);

    let count = valid.len();
    let mut combined = vec![0.0f32; expected];
    for vector in &valid {
        for (acc, &x) in combined.iter_mut().zip(vector.iter()) {
            *acc += x;
        }
    }
    for acc in combined.iter_mut() {
        *acc /= count as f32;
    }

    if combined.iter().all(|&x| x == 0.0) {
        return None;
    }

    Some((combined, count))
}

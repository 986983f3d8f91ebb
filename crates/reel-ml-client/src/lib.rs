//! Model gateway client.
//!
//! Wraps the HTTP service that fronts embedding and generative models:
//! - synchronous single and segmented embeddings for small content
//! - asynchronous segmented embeddings for large video/audio, polled
//!   through [`tracker::AsyncJobTracker`]
//! - generative completion for criteria generation and video analysis
//!
//! Result payloads are validated once at this boundary; anything with an
//! unexpected shape is rejected instead of leaking into business logic.

pub mod client;
pub mod error;
pub mod tracker;
pub mod types;

pub use client::{MlClient, MlClientConfig};
pub use error::{MlError, MlResult};
pub use tracker::{
    combine_segment_embeddings, AsyncJobTracker, InvocationPoller, InvocationState, TrackerConfig,
};
pub use types::{
    EmbeddingPayload, InvocationHandle, InvocationStatus, MediaSource, RemoteStatus,
};

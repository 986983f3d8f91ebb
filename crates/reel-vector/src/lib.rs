//! Dimension-partitioned vector storage and exact similarity search.
//!
//! Vectors are sharded by embedding dimension. Each shard is persisted to
//! object storage record-by-record and hydrated lazily on first search.
//! Search is exact brute-force cosine similarity, which is appropriate for
//! the per-job scale of tens to low-hundreds of vectors.

pub mod backend;
pub mod error;
pub mod similarity;
pub mod store;

pub use backend::{S3VectorBackend, VectorBackend};
pub use error::{VectorError, VectorResult};
pub use similarity::cosine_similarity;
pub use store::{SearchHit, VectorStore};

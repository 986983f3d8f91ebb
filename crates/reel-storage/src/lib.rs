//! Object storage for the Reel backend.
//!
//! Provides:
//! - S3 client wrapper with typed errors
//! - Vector record persistence under `vectors/{dimension}/{id}.json`

pub mod client;
pub mod error;
pub mod vectors;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use vectors::VectorObjectStore;

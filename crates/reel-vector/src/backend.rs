//! Durable persistence backend for the vector store.

use async_trait::async_trait;

use reel_models::{Dimension, VectorRecord};
use reel_storage::VectorObjectStore;

use crate::error::{VectorError, VectorResult};

/// Persistence contract for vector records.
///
/// The store persists through this trait before making a record visible in
/// memory, and hydrates shards from it on first access.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Persist one record.
    async fn put_record(&self, record: &VectorRecord) -> VectorResult<()>;

    /// Load every persisted record for a dimension.
    async fn load_dimension(&self, dimension: Dimension) -> VectorResult<Vec<VectorRecord>>;

    /// Count persisted records for a dimension.
    async fn count(&self, dimension: Dimension) -> VectorResult<usize>;
}

/// Object-storage backed persistence.
pub struct S3VectorBackend {
    store: VectorObjectStore,
}

impl S3VectorBackend {
    pub fn new(store: VectorObjectStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VectorBackend for S3VectorBackend {
    async fn put_record(&self, record: &VectorRecord) -> VectorResult<()> {
        self.store
            .put_record(record)
            .await
            .map_err(|e| VectorError::persistence(e.to_string()))
    }

    async fn load_dimension(&self, dimension: Dimension) -> VectorResult<Vec<VectorRecord>> {
        self.store
            .load_dimension(dimension)
            .await
            .map_err(|e| VectorError::persistence(e.to_string()))
    }

    async fn count(&self, dimension: Dimension) -> VectorResult<usize> {
        self.store
            .count(dimension)
            .await
            .map_err(|e| VectorError::persistence(e.to_string()))
    }
}

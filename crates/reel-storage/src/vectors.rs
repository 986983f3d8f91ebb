//! Durable vector record persistence.
//!
//! Records live under `vectors/{dimension}/{id}.json`, one JSON envelope
//! per object, so a whole shard can be rebuilt by listing its prefix.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use reel_models::{Dimension, VectorId, VectorRecord};

use crate::client::S3Client;
use crate::error::{StorageError, StorageResult};

/// Persisted JSON envelope for one vector record.
#[derive(Debug, Serialize, Deserialize)]
struct VectorEnvelope {
    id: String,
    vector: Vec<f32>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

/// Vector persistence on top of the object store.
#[derive(Clone)]
pub struct VectorObjectStore {
    client: S3Client,
}

impl VectorObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    fn key_for(dimension: Dimension, id: &VectorId) -> String {
        format!("vectors/{}/{}.json", dimension, id)
    }

    fn prefix_for(dimension: Dimension) -> String {
        format!("vectors/{}/", dimension)
    }

    /// Persist one record. The caller only makes the record visible in
    /// memory after this succeeds.
    pub async fn put_record(&self, record: &VectorRecord) -> StorageResult<()> {
        let envelope = VectorEnvelope {
            id: record.id.as_str().to_string(),
            vector: record.values.clone(),
            metadata: record.metadata.clone(),
        };

        let key = Self::key_for(record.dimension, &record.id);
        let body = serde_json::to_vec(&envelope)?;

        self.client
            .upload_bytes(body, &key, "application/json")
            .await?;

        debug!("Vector {} (dim={}) persisted to {}", record.id, record.dimension, key);
        Ok(())
    }

    /// Load every persisted record for one dimension.
    ///
    /// Objects that fail to download or parse are skipped with a warning;
    /// a single corrupt record must not make the whole shard unreadable.
    pub async fn load_dimension(&self, dimension: Dimension) -> StorageResult<Vec<VectorRecord>> {
        let prefix = Self::prefix_for(dimension);
        let keys = self.client.list_keys(&prefix).await?;

        debug!("Found {} objects for dimension {}", keys.len(), dimension);

        let mut records = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|k| k.ends_with(".json")) {
            let bytes = match self.client.download_bytes(key).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping vector object {}: {}", key, e);
                    continue;
                }
            };

            match serde_json::from_slice::<VectorEnvelope>(&bytes) {
                Ok(envelope) => records.push(VectorRecord {
                    id: VectorId::from_string(envelope.id),
                    dimension,
                    values: envelope.vector,
                    metadata: envelope.metadata,
                }),
                Err(e) => warn!("Skipping malformed vector object {}: {}", key, e),
            }
        }

        debug!("Loaded {} vectors for dimension {}", records.len(), dimension);
        Ok(records)
    }

    /// Count persisted records for one dimension without downloading them.
    pub async fn count(&self, dimension: Dimension) -> StorageResult<usize> {
        let keys = self.client.list_keys(&Self::prefix_for(dimension)).await?;
        Ok(keys.iter().filter(|k| k.ends_with(".json")).count())
    }

    /// Remove one persisted record.
    pub async fn delete_record(&self, dimension: Dimension, id: &VectorId) -> StorageResult<()> {
        self.client
            .delete_object(&Self::key_for(dimension, id))
            .await
            .map_err(|e| StorageError::delete_failed(format!("vector {}: {}", id, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = VectorId::from_string("abc");
        assert_eq!(
            VectorObjectStore::key_for(Dimension::D1024, &id),
            "vectors/1024/abc.json"
        );
        assert_eq!(VectorObjectStore::prefix_for(Dimension::D256), "vectors/256/");
    }

    #[test]
    fn test_envelope_parse() {
        let json = r#"{"id":"v1","vector":[0.1,0.2],"metadata":{"filename":"a.txt"}}"#;
        let envelope: VectorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.id, "v1");
        assert_eq!(envelope.vector.len(), 2);
        assert_eq!(envelope.metadata["filename"], "a.txt");
    }
}

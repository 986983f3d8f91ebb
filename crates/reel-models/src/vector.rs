//! Vector records stored in the dimension-partitioned vector store.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Dimension;

/// Opaque identifier for a stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorId(pub String);

impl VectorId {
    /// Generate a new random vector ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VectorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored embedding with its metadata.
///
/// Immutable after creation: the record is only ever inserted and removed,
/// never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record identifier (unique across all dimensions)
    pub id: VectorId,

    /// The shard this record belongs to
    pub dimension: Dimension,

    /// Embedding components; `values.len() == dimension.size()`
    pub values: Vec<f32>,

    /// Caller-supplied metadata (filename, modality, source URL, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Create a record, assuming values already match the dimension.
    pub fn new(id: VectorId, dimension: Dimension, values: Vec<f32>, metadata: Map<String, Value>) -> Self {
        Self {
            id,
            dimension,
            values,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serde() {
        let mut metadata = Map::new();
        metadata.insert("filename".into(), Value::String("a.txt".into()));

        let record = VectorRecord::new(
            VectorId::from_string("v1"),
            Dimension::D256,
            vec![0.5; 256],
            metadata,
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: VectorRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id.as_str(), "v1");
        assert_eq!(parsed.dimension, Dimension::D256);
        assert_eq!(parsed.values.len(), 256);
        assert_eq!(parsed.metadata["filename"], "a.txt");
    }
}

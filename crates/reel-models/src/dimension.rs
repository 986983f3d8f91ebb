//! Embedding dimensions recognized by the vector store.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a dimension is not one of the recognized values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported embedding dimension: {0} (supported: 256, 384, 1024, 3072)")]
pub struct DimensionError(pub usize);

/// An embedding dimension supported by the store.
///
/// Every vector belongs to exactly one dimension-partitioned shard, so the
/// set of dimensions is closed. Serialized as the plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dimension {
    D256,
    D384,
    D1024,
    D3072,
}

impl Dimension {
    /// All supported dimensions, in ascending order.
    pub const ALL: [Dimension; 4] = [
        Dimension::D256,
        Dimension::D384,
        Dimension::D1024,
        Dimension::D3072,
    ];

    /// The number of components a vector of this dimension carries.
    pub fn size(&self) -> usize {
        match self {
            Dimension::D256 => 256,
            Dimension::D384 => 384,
            Dimension::D1024 => 1024,
            Dimension::D3072 => 3072,
        }
    }
}

impl Default for Dimension {
    /// Default query dimension when nothing else selects one.
    fn default() -> Self {
        Dimension::D1024
    }
}

impl TryFrom<usize> for Dimension {
    type Error = DimensionError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            256 => Ok(Dimension::D256),
            384 => Ok(Dimension::D384),
            1024 => Ok(Dimension::D1024),
            3072 => Ok(Dimension::D3072),
            other => Err(DimensionError(other)),
        }
    }
}

impl From<Dimension> for usize {
    fn from(value: Dimension) -> Self {
        value.size()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.size())
    }
}

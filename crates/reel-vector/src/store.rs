//! The dimension-partitioned vector store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use reel_models::{Dimension, VectorId, VectorRecord};

use crate::backend::VectorBackend;
use crate::error::{VectorError, VectorResult};
use crate::similarity::cosine_similarity;

/// Minimum component count for a plausible embedding. Anything shorter is
/// rejected as malformed regardless of the supported-dimension check.
const MIN_COMPONENTS: usize = 100;

/// One search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: VectorId,
    pub similarity: f32,
    pub metadata: Map<String, Value>,
}

#[derive(Default)]
struct ShardMap {
    /// Records per dimension, in insertion order (ties in search keep it).
    records: HashMap<Dimension, Vec<VectorRecord>>,
    /// Dimensions already hydrated from durable storage.
    hydrated: HashSet<Dimension>,
}

/// Durable, dimension-partitioned vector store with exact cosine search.
pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    shards: RwLock<ShardMap>,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn VectorBackend>) -> Self {
        Self {
            backend,
            shards: RwLock::new(ShardMap::default()),
        }
    }

    /// Insert a vector, persisting it before it becomes visible in memory.
    ///
    /// If persistence fails the insert is fully rolled back: nothing is
    /// added to the in-memory shard and the error is surfaced.
    pub async fn insert(
        &self,
        id: VectorId,
        values: Vec<f32>,
        metadata: Map<String, Value>,
    ) -> VectorResult<()> {
        if values.is_empty() {
            return Err(VectorError::invalid_vector("vector is empty"));
        }
        if values.iter().all(|&x| x == 0.0) {
            return Err(VectorError::invalid_vector("vector contains all zeros"));
        }
        if values.len() < MIN_COMPONENTS {
            return Err(VectorError::invalid_vector(format!(
                "vector dimension too small: {}",
                values.len()
            )));
        }

        let dimension = Dimension::try_from(values.len())
            .map_err(|e| VectorError::UnsupportedDimension(e.0))?;

        let mut metadata = metadata;
        metadata.insert("dimension".to_string(), Value::from(dimension.size()));

        let record = VectorRecord::new(id, dimension, values, metadata);

        // Durable first; memory only reflects persisted records.
        self.backend.put_record(&record).await?;

        let mut shards = self.shards.write().await;
        let shard = shards.records.entry(dimension).or_default();
        if let Some(existing) = shard.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            shard.push(record);
        }

        Ok(())
    }

    /// Exact similarity search.
    ///
    /// When `target` is given the query length must match it; otherwise the
    /// query's own length selects the shard. The shard is hydrated from
    /// durable storage on first access and cached for the process lifetime.
    pub async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        target: Option<Dimension>,
    ) -> VectorResult<Vec<SearchHit>> {
        let dimension = match target {
            Some(target) => {
                if query.len() != target.size() {
                    return Err(VectorError::DimensionMismatch {
                        query: query.len(),
                        target,
                    });
                }
                target
            }
            None => Dimension::try_from(query.len())
                .map_err(|e| VectorError::UnsupportedDimension(e.0))?,
        };

        self.hydrate_if_needed(dimension).await?;

        let shards = self.shards.read().await;
        let records = match shards.records.get(&dimension) {
            Some(records) if !records.is_empty() => records,
            _ => {
                debug!("No vectors for dimension {}", dimension);
                return Ok(Vec::new());
            }
        };

        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter_map(|record| {
                let similarity = cosine_similarity(query, &record.values);
                if similarity.is_finite() {
                    Some(SearchHit {
                        id: record.id.clone(),
                        similarity,
                        metadata: record.metadata.clone(),
                    })
                } else {
                    debug!("Discarding degenerate similarity for {}", record.id);
                    None
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal similarities.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Count of in-memory records per dimension, falling back to durable
    /// storage when nothing is loaded yet.
    pub async fn dimension_stats(&self) -> HashMap<Dimension, usize> {
        let mut stats: HashMap<Dimension, usize> = {
            let shards = self.shards.read().await;
            Dimension::ALL
                .iter()
                .map(|&d| (d, shards.records.get(&d).map_or(0, Vec::len)))
                .collect()
        };

        if stats.values().sum::<usize>() == 0 {
            for &dimension in Dimension::ALL.iter() {
                match self.backend.count(dimension).await {
                    Ok(count) => {
                        stats.insert(dimension, count);
                    }
                    Err(e) => warn!("Failed to count dimension {}: {}", dimension, e),
                }
            }
        }

        stats
    }

    /// The dimension a caller-unspecified query should use: the most
    /// populous one, or the default when the store is empty.
    pub async fn auto_dimension(&self) -> Dimension {
        let stats = self.dimension_stats().await;

        let mut best = Dimension::default();
        let mut best_count = 0usize;
        for &dimension in Dimension::ALL.iter() {
            let count = stats.get(&dimension).copied().unwrap_or(0);
            if count > best_count {
                best = dimension;
                best_count = count;
            }
        }

        if best_count == 0 {
            Dimension::default()
        } else {
            debug!("Most common dimension: {} ({} vectors)", best, best_count);
            best
        }
    }

    /// Hydrate a shard from durable storage, once per process lifetime.
    async fn hydrate_if_needed(&self, dimension: Dimension) -> VectorResult<()> {
        {
            let shards = self.shards.read().await;
            if shards.hydrated.contains(&dimension) {
                return Ok(());
            }
        }

        debug!("Hydrating dimension {} from durable storage", dimension);
        let loaded = self.backend.load_dimension(dimension).await?;

        let mut shards = self.shards.write().await;
        if shards.hydrated.contains(&dimension) {
            return Ok(()); // another task hydrated while we were loading
        }

        let shard = shards.records.entry(dimension).or_default();
        for record in loaded {
            // Records inserted this process were persisted before being
            // made visible, so they also show up in the load; keep the
            // in-memory copy.
            if !shard.iter().any(|r| r.id == record.id) {
                shard.push(record);
            }
        }
        let total = shard.len();
        shards.hydrated.insert(dimension);
        debug!("Hydrated {} vectors for dimension {}", total, dimension);

        Ok(())
    }
}

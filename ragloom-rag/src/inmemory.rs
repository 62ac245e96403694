//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps collections in a `HashMap` behind a
//! `tokio::sync::RwLock`. It is meant for development, tests, and small
//! corpora.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{ScoredPoint, StoredPoint};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "inmemory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    points: HashMap<String, StoredPoint>,
}

/// An in-memory vector store.
///
/// Ties in similarity are broken by ascending point id so results are
/// deterministic.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in `collection`, or `None` if it does not exist.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.points.len())
    }
}

/// Cosine similarity of two vectors. Returns 0.0 if either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn not_found(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection not found: '{collection}'"))
}

fn dimension_mismatch(expected: usize, actual: usize) -> RagError {
    RagError::store(BACKEND, format!("dimension mismatch: expected {expected}, got {actual}"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(name) {
            Some(existing) if existing.dimensions != dimensions => Err(RagError::Config(format!(
                "collection '{name}' has dimension {}, expected {dimensions}",
                existing.dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                collections
                    .insert(name.to_string(), Collection { dimensions, points: HashMap::new() });
                debug!(collection = name, dimensions, "created in-memory collection");
                Ok(())
            }
        }
    }

    async fn upsert(&self, collection: &str, points: &[StoredPoint]) -> Result<Vec<String>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != store.dimensions) {
            return Err(dimension_mismatch(store.dimensions, bad.vector.len()));
        }

        let ids = points.iter().map(|p| p.id.clone()).collect();
        for point in points {
            store.points.insert(point.id.clone(), point.clone());
        }
        debug!(collection, count = points.len(), "upserted points");
        Ok(ids)
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| not_found(collection))?;
        if vector.len() != store.dimensions {
            return Err(dimension_mismatch(store.dimensions, vector.len()));
        }

        let mut scored: Vec<ScoredPoint> = store
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                payload: point.payload.clone(),
                score: cosine_similarity(&point.vector, vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| not_found(collection))?;
        for id in ids {
            store.points.remove(id);
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }
}

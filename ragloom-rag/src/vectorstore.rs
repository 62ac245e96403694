//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{ScoredPoint, StoredPoint};
use crate::error::Result;

/// A storage backend for vector embeddings with cosine similarity search.
///
/// Stores must reject any point whose vector length differs from the
/// collection's dimension before writing it. Queries never create
/// collections; only [`ensure_collection`](VectorStore::ensure_collection)
/// does, and it runs during ingestion setup.
///
/// # Example
///
/// ```rust,ignore
/// use ragloom_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.ensure_collection("docs", 1024).await?;
/// let ids = store.upsert("docs", &points).await?;
/// let hits = store.query("docs", &query_vector, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Create the collection if absent.
    ///
    /// An existing collection with a different dimension is a
    /// [`Config`](crate::RagError::Config) error.
    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or overwrite points by id, returning the stored ids in input order.
    ///
    /// An empty slice returns an empty list without touching the backend.
    async fn upsert(&self, collection: &str, points: &[StoredPoint]) -> Result<Vec<String>>;

    /// Return at most `top_k` points ordered by descending cosine similarity.
    async fn query(&self, collection: &str, vector: &[f32], top_k: usize)
    -> Result<Vec<ScoredPoint>>;

    /// Delete points by id. Unknown ids are ignored.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()>;

    /// Delete a collection and all its points.
    async fn delete_collection(&self, name: &str) -> Result<()>;
}

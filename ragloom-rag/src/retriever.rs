//! Top-k retrieval over a vector store collection.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::RagConfig;
use crate::document::Document;
use crate::embedding::EmbeddingBatcher;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embeds a query and returns the most similar stored chunks as documents.
///
/// Every call is a live round trip to the embedding service and the store.
#[derive(Clone)]
pub struct Retriever {
    batcher: EmbeddingBatcher,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `top_k` is zero.
    pub fn new(
        batcher: EmbeddingBatcher,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        Ok(Self { batcher, store, collection: collection.into(), top_k, similarity_threshold: None })
    }

    /// Apply `top_k` and `similarity_threshold` from `config`.
    pub fn from_config(
        batcher: EmbeddingBatcher,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        config: &RagConfig,
    ) -> Result<Self> {
        let mut retriever = Self::new(batcher, store, collection, config.top_k)?;
        retriever.similarity_threshold = config.similarity_threshold;
        Ok(retriever)
    }

    /// Drop hits scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return at most `top_k` documents by descending similarity, each
    /// carrying its score under the `score` metadata key.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let mut vectors = self.batcher.embed(&[query.to_string()]).await.inspect_err(|e| {
            error!(error = %e, "query embedding failed");
        })?;
        let vector = vectors.pop().ok_or(RagError::CardinalityMismatch {
            batch_start: 0,
            expected: 1,
            actual: 0,
        })?;

        let mut hits =
            self.store.query(&self.collection, &vector, self.top_k).await.inspect_err(|e| {
                error!(collection = %self.collection, error = %e, "vector store query failed");
            })?;
        hits.truncate(self.top_k);
        if let Some(threshold) = self.similarity_threshold {
            hits.retain(|hit| hit.score >= threshold);
        }

        debug!(collection = %self.collection, result_count = hits.len(), "retrieved documents");
        Ok(hits.into_iter().map(|hit| hit.into_document()).collect())
    }
}

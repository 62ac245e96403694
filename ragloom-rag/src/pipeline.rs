//! Ingestion pipeline.
//!
//! The [`IngestionPipeline`] runs load → split → embed → store. Each stage
//! receives the previous stage's full output; the first failing stage aborts
//! the call with [`RagError::Ingestion`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragloom_rag::{IngestionPipeline, InMemoryVectorStore, RagConfig, Source};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .collection("docs")
//!     .build()?;
//!
//! pipeline.setup().await?;
//! let ids = pipeline.ingest(&Source::path("notes.txt")).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, StoredPoint};
use crate::embedding::{EmbeddingBatcher, EmbeddingProvider};
use crate::error::{IngestStage, RagError, Result};
use crate::loader::{FileLoader, Loader, Source};
use crate::vectorstore::VectorStore;

/// Loads, splits, embeds and indexes documents into one collection.
pub struct IngestionPipeline {
    loader: Arc<dyn Loader>,
    chunker: Arc<dyn Chunker>,
    batcher: EmbeddingBatcher,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Create the collection if absent, sized by the embedding provider.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the collection exists with a different
    /// dimension.
    pub async fn setup(&self) -> Result<()> {
        let dimensions = self.batcher.dimensions();
        self.store.ensure_collection(&self.collection, dimensions).await.inspect_err(|e| {
            error!(collection = %self.collection, dimensions, error = %e, "collection setup failed");
        })
    }

    /// Ingest every document the loader yields for `source`.
    ///
    /// Returns the ids of the stored points in chunk order.
    pub async fn ingest(&self, source: &Source) -> Result<Vec<String>> {
        let documents = self.loader.load(source).await.map_err(|e| {
            error!(source = %source.uri(), error = %e, "load failed");
            e.at_stage(IngestStage::Load)
        })?;
        self.ingest_documents(documents).await
    }

    /// Ingest documents the caller already holds.
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<Vec<String>> {
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in &documents {
            let split = self.chunker.chunk(document).map_err(|e| {
                error!(document.id = %document.id, error = %e, "split failed");
                e.at_stage(IngestStage::Split)
            })?;
            info!(document.id = %document.id, chunk_count = split.len(), "split document");
            chunks.extend(split);
        }
        if chunks.is_empty() {
            info!(collection = %self.collection, chunk_count = 0, "nothing to ingest");
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.batcher.embed(&texts).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "embedding failed during ingestion");
            e.at_stage(IngestStage::Embed)
        })?;

        let points: Vec<StoredPoint> =
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| chunk.into_point(vector)).collect();
        let ids = self.store.upsert(&self.collection, &points).await.map_err(|e| {
            error!(collection = %self.collection, error = %e, "upsert failed during ingestion");
            e.at_stage(IngestStage::Store)
        })?;

        info!(
            collection = %self.collection,
            document_count = documents.len(),
            chunk_count = ids.len(),
            "ingested documents"
        );
        Ok(ids)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `vector_store` and `collection` are required, as is either a `batcher` or
/// an `embedding_provider`. The chunker and batcher otherwise derive from
/// `config` (default [`RagConfig`]); the loader defaults to [`FileLoader`].
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    loader: Option<Arc<dyn Loader>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    batcher: Option<EmbeddingBatcher>,
    store: Option<Arc<dyn VectorStore>>,
    collection: Option<String>,
}

impl IngestionPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Use a preconfigured batcher instead of building one from `config`.
    pub fn batcher(mut self, batcher: EmbeddingBatcher) -> Self {
        self.batcher = Some(batcher);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// configuration is inconsistent.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let batcher = match (self.batcher, self.embedding_provider) {
            (Some(batcher), _) => batcher,
            (None, Some(provider)) => EmbeddingBatcher::new(provider, config.embedding_batch_size)?
                .with_concurrency(config.embedding_concurrency),
            (None, None) => {
                return Err(RagError::Config("embedding_provider is required".to_string()));
            }
        };
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };
        let store =
            self.store.ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let collection =
            self.collection.ok_or_else(|| RagError::Config("collection is required".to_string()))?;

        Ok(IngestionPipeline {
            loader: self.loader.unwrap_or_else(|| Arc::new(FileLoader::new())),
            chunker,
            batcher,
            store,
            collection,
        })
    }
}

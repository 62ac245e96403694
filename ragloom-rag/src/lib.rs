//! # ragloom-rag
//!
//! Ingestion and retrieval-augmented generation for Ragloom.
//!
//! ## Overview
//!
//! Two pipelines share a vector store:
//!
//! - **Ingestion**: [`IngestionPipeline`] loads documents, splits them with a
//!   [`Chunker`], embeds the chunks through an [`EmbeddingBatcher`] and
//!   upserts them into a [`VectorStore`] collection.
//! - **Retrieval**: [`RetrievalGraph`] joins a live [`Retriever`] search with
//!   prompt assembly and a streaming [`ChatModel`](ragloom_model::ChatModel).
//!
//! Backends:
//!
//! - [`InMemoryVectorStore`] - always available
//! - [`qdrant::QdrantVectorStore`] - feature `qdrant`
//! - [`openai::OpenAIEmbeddingProvider`] - feature `openai`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragloom_rag::*;
//!
//! let config = RagConfig::builder().chunk_size(500).chunk_overlap(100).build()?;
//! let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
//! let pipeline = IngestionPipeline::builder()
//!     .config(config.clone())
//!     .embedding_provider(embedder.clone())
//!     .vector_store(store.clone())
//!     .collection("docs")
//!     .build()?;
//! pipeline.setup().await?;
//! pipeline.ingest(&Source::path("notes.txt")).await?;
//!
//! let batcher = EmbeddingBatcher::new(embedder, config.embedding_batch_size)?;
//! let retriever = Retriever::from_config(batcher, store, "docs", &config)?;
//! let graph = RetrievalGraph::new(retriever, model, ChatPrompt::default())?;
//! let answer = graph.answer("What is Rust?", CancellationToken::new()).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod inmemory;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, DEFAULT_SEPARATORS, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Metadata, ScoredPoint, StoredPoint};
pub use embedding::{EmbeddingBatcher, EmbeddingProvider};
pub use error::{IngestStage, RagError, Result};
pub use graph::{NO_CONTEXT, RetrievalGraph, build_retrieval_graph, format_context};
pub use inmemory::InMemoryVectorStore;
pub use loader::{FileLoader, Loader, Source};
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
pub use prompt::{ChatPrompt, DEFAULT_SYSTEM_PROMPT, PromptTemplate};
pub use retriever::Retriever;
pub use vectorstore::VectorStore;

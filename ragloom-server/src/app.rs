//! Wiring shared by the HTTP and command-line front ends.

use std::sync::Arc;

use ragloom_rag::openai::OpenAIEmbeddingProvider;
use ragloom_rag::qdrant::QdrantVectorStore;
use ragloom_rag::{
    ChatPrompt, EmbeddingBatcher, EmbeddingProvider, InMemoryVectorStore, IngestionPipeline,
    RetrievalGraph, Retriever, Source, VectorStore,
};
use tracing::info;

use crate::config::AppConfig;
use crate::context::SharedContext;
use crate::error::Result;
use crate::history::ChatHistory;

/// Builds an embedding provider from the current configuration.
pub type EmbedderFactory =
    Arc<dyn Fn(&AppConfig) -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// The default factory: an OpenAI-compatible embeddings endpoint.
pub fn openai_embedder() -> EmbedderFactory {
    Arc::new(|config: &AppConfig| {
        let provider = OpenAIEmbeddingProvider::new(config.api_key()?)?
            .with_base_url(config.base_url.clone())
            .with_model(config.embedding_model.clone(), config.embedding_dimensions)
            .with_timeout(config.timeout())?;
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);
        Ok(provider)
    })
}

/// Open the configured vector store: Qdrant when a URL is set, otherwise
/// a store that lives as long as the process.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    match config.qdrant_url() {
        Some(url) => {
            info!(url, "using qdrant vector store");
            Ok(Arc::new(QdrantVectorStore::new(url, config.timeout())?))
        }
        None => {
            info!("using in-memory vector store");
            Ok(Arc::new(InMemoryVectorStore::new()))
        }
    }
}

/// Everything a request needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<SharedContext>,
    pub store: Arc<dyn VectorStore>,
    pub history: Arc<ChatHistory>,
    embedder: EmbedderFactory,
}

impl AppState {
    pub fn new(
        context: Arc<SharedContext>,
        store: Arc<dyn VectorStore>,
        embedder: EmbedderFactory,
    ) -> Self {
        Self { context, store, history: Arc::new(ChatHistory::new()), embedder }
    }

    /// The production wiring for an already loaded context.
    pub async fn from_context(context: Arc<SharedContext>) -> Result<Self> {
        let store = open_store(&context.config().await)?;
        Ok(Self::new(context, store, openai_embedder()))
    }

    /// Create the collection if it does not exist yet.
    pub async fn prepare(&self) -> Result<()> {
        let config = self.context.config().await;
        self.store.ensure_collection(&config.collection, config.embedding_dimensions).await?;
        Ok(())
    }

    /// A query graph over the current configuration and cached chat model.
    pub async fn retrieval_graph(&self) -> Result<RetrievalGraph> {
        let config = self.context.config().await;
        let rag = config.rag_config()?;
        let model = self.context.get().await?;
        let batcher = EmbeddingBatcher::new((self.embedder)(&config)?, rag.embedding_batch_size)?;
        let retriever = Retriever::from_config(batcher, self.store.clone(), &config.collection, &rag)?;
        Ok(RetrievalGraph::new(retriever, model, ChatPrompt::with_system(config.system_prompt))?)
    }

    pub async fn ingestion_pipeline(&self) -> Result<IngestionPipeline> {
        let config = self.context.config().await;
        let pipeline = IngestionPipeline::builder()
            .config(config.rag_config()?)
            .embedding_provider((self.embedder)(&config)?)
            .vector_store(self.store.clone())
            .collection(config.collection)
            .build()?;
        pipeline.setup().await?;
        Ok(pipeline)
    }

    /// Ingest one source and return the stored point ids.
    pub async fn ingest(&self, source: &Source) -> Result<Vec<String>> {
        let pipeline = self.ingestion_pipeline().await?;
        let ids = pipeline.ingest(source).await?;
        info!(source = %source.uri(), chunk_count = ids.len(), "source ingested");
        Ok(ids)
    }
}

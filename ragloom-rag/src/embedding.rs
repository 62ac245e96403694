//! Embedding providers and the bounded-parallel batcher.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error};

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. A batch call must return exactly one vector per input, in
/// input order; [`EmbeddingBatcher`] enforces the count.
///
/// # Example
///
/// ```rust,ignore
/// use ragloom_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding vector for a single text input.
    ///
    /// The default implementation sends a single-item batch.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.len() {
            1 => Ok(vectors.remove(0)),
            actual => Err(RagError::CardinalityMismatch { batch_start: 0, expected: 1, actual }),
        }
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Splits texts into fixed-size batches and embeds them with bounded parallelism.
///
/// Results are reassembled in input order regardless of which batch finishes
/// first. The first failing batch aborts the whole call; batches still in
/// flight are dropped and nothing is retried.
#[derive(Clone)]
pub struct EmbeddingBatcher {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
}

impl std::fmt::Debug for EmbeddingBatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingBatcher")
            .field("provider", &self.provider.name())
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl EmbeddingBatcher {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `batch_size` is zero.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::Config("embedding batch size must be greater than zero".into()));
        }
        Ok(Self { provider, batch_size, concurrency: 1 })
    }

    /// Allow up to `concurrency` batches in flight. Values below one are treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Dimensionality of the vectors this batcher produces.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embed `texts`, returning one vector per text in input order.
    ///
    /// # Errors
    ///
    /// - [`RagError::CardinalityMismatch`] if a batch returns the wrong number of vectors.
    /// - [`RagError::Embedding`] if a vector has the wrong dimension.
    /// - Any error raised by the provider.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<(usize, Vec<String>)> =
            texts.chunks(self.batch_size).map(<[String]>::to_vec).enumerate().collect();
        let batch_count = batches.len();
        let concurrency = self.concurrency.min(batch_count);
        debug!(
            provider = self.provider.name(),
            text_count = texts.len(),
            batch_count,
            concurrency,
            "embedding texts"
        );

        let mut slots: Vec<Option<Vec<Vec<f32>>>> = vec![None; batch_count];
        let mut completed = stream::iter(batches)
            .map(|(index, batch)| async move {
                let batch_start = index * self.batch_size;
                self.embed_one(batch_start, &batch).await.map(|vectors| (index, vectors))
            })
            .buffer_unordered(concurrency);

        while let Some((index, vectors)) = completed.try_next().await? {
            slots[index] = Some(vectors);
        }

        Ok(slots.into_iter().flatten().flatten().collect())
    }

    async fn embed_one(&self, batch_start: usize, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.provider.embed_batch(batch).await.inspect_err(|e| {
            error!(provider = self.provider.name(), batch_start, error = %e, "embedding batch failed");
        })?;

        if vectors.len() != batch.len() {
            error!(
                provider = self.provider.name(),
                batch_start,
                expected = batch.len(),
                actual = vectors.len(),
                "embedding batch cardinality mismatch"
            );
            return Err(RagError::CardinalityMismatch {
                batch_start,
                expected: batch.len(),
                actual: vectors.len(),
            });
        }

        let dimensions = self.provider.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(RagError::embedding(
                self.provider.name(),
                format!("dimension mismatch: expected {dimensions}, got {}", bad.len()),
            ));
        }

        debug!(provider = self.provider.name(), batch_start, batch_len = batch.len(), "embedded batch");
        Ok(vectors)
    }
}

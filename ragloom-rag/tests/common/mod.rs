#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ragloom_rag::{
    EmbeddingProvider, InMemoryVectorStore, RagError, Result, ScoredPoint, StoredPoint,
    VectorStore,
};

/// Embeds text as a 26-dimensional letter-frequency vector.
#[derive(Debug, Default)]
pub struct LetterEmbedder {
    pub calls: AtomicUsize,
}

impl LetterEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    fn name(&self) -> &str {
        "letters"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        26
    }
}

/// Returns one vector fewer than requested.
#[derive(Debug, Default)]
pub struct ShortEmbedder;

#[async_trait]
impl EmbeddingProvider for ShortEmbedder {
    fn name(&self) -> &str {
        "short"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Maps `"t{n}"` to `[n]`, sleeping longer for earlier batches so that
/// concurrent batches complete out of order.
#[derive(Debug, Default)]
pub struct IndexEmbedder;

impl IndexEmbedder {
    pub fn text(n: usize) -> String {
        format!("t{n}")
    }
}

#[async_trait]
impl EmbeddingProvider for IndexEmbedder {
    fn name(&self) -> &str {
        "index"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let n: f32 = text[1..]
                .parse()
                .map_err(|_| RagError::Config(format!("unexpected text {text}")))?;
            vectors.push(vec![n]);
        }
        let first = vectors.first().map(|v| v[0] as u64).unwrap_or_default();
        tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(first))).await;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        1
    }
}

/// An [`InMemoryVectorStore`] that counts write calls.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: InMemoryVectorStore,
    pub upserts: AtomicUsize,
}

impl CountingStore {
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn ensure_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.ensure_collection(name, dimensions).await
    }

    async fn upsert(&self, collection: &str, points: &[StoredPoint]) -> Result<Vec<String>> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(collection, points).await
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        self.inner.query(collection, vector, top_k).await
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<()> {
        self.inner.delete(collection, ids).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }
}

/// A store whose queries always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn ensure_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, _collection: &str, _points: &[StoredPoint]) -> Result<Vec<String>> {
        Err(RagError::Store { backend: "failing".into(), message: "unreachable".into() })
    }

    async fn query(
        &self,
        _collection: &str,
        _vector: &[f32],
        _top_k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        Err(RagError::Store { backend: "failing".into(), message: "unreachable".into() })
    }

    async fn delete(&self, _collection: &str, _ids: &[String]) -> Result<()> {
        Ok(())
    }

    async fn delete_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

pub fn letters() -> Arc<LetterEmbedder> {
    Arc::new(LetterEmbedder::default())
}

//! Configuration for ingestion and retrieval.

use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_SEPARATORS;
use crate::error::{RagError, Result};

/// Configuration parameters shared by the ingestion pipeline and the retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Separators tried in priority order when splitting text.
    pub separators: Vec<String>,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps every hit.
    pub similarity_threshold: Option<f32>,
    /// Maximum number of texts per embedding request.
    pub embedding_batch_size: usize,
    /// Maximum number of embedding requests in flight.
    pub embedding_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            top_k: 5,
            similarity_threshold: None,
            embedding_batch_size: 32,
            embedding_concurrency: 1,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `embedding_batch_size == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.embedding_batch_size == 0 {
            return Err(RagError::Config(
                "embedding_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Replace the separator priority list.
    pub fn separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Drop retrieved documents scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Values below one are treated as one.
    pub fn embedding_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embedding_concurrency = concurrency.max(1);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_deployment() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.embedding_batch_size, 32);
        assert_eq!(config.separators[0], "\n\n");
    }

    #[test]
    fn inconsistent_parameters_are_rejected() {
        let overlap = RagConfig::builder().chunk_size(100).chunk_overlap(100).build();
        assert!(matches!(overlap, Err(RagError::Config(msg)) if msg.contains("chunk_overlap")));

        assert!(matches!(RagConfig::builder().top_k(0).build(), Err(RagError::Config(_))));
        assert!(matches!(
            RagConfig::builder().embedding_batch_size(0).build(),
            Err(RagError::Config(_))
        ));
    }
}

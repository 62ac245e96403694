//! Error types for the `ragloom-rag` crate.

use std::fmt;

use thiserror::Error;

/// The ingestion stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Load,
    Split,
    Embed,
    Store,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Split => "split",
            Self::Embed => "embed",
            Self::Store => "store",
        })
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error. Fatal; never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document source is missing or unreadable.
    #[error("Load error ({source_uri}): {message}")]
    Load {
        /// The source that could not be loaded.
        source_uri: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service failed (auth, rate limit, network, ...).
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A batch produced a different number of vectors than it had inputs.
    #[error(
        "Cardinality mismatch in batch starting at {batch_start}: expected {expected} vectors, got {actual}"
    )]
    CardinalityMismatch {
        /// Index of the batch's first input in the original sequence.
        batch_start: usize,
        /// Number of inputs in the batch.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    Store {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A prompt template could not be rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// The chat service failed.
    #[error(transparent)]
    Generation(#[from] ragloom_model::ModelError),

    /// An ingestion call failed; `source` is the first stage failure.
    #[error("Ingestion failed at {stage} stage: {source}")]
    Ingestion {
        /// The stage that failed.
        stage: IngestStage,
        /// The stage's error.
        #[source]
        source: Box<RagError>,
    },

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::Store { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.to_string(), message: message.into() }
    }

    pub(crate) fn at_stage(self, stage: IngestStage) -> Self {
        Self::Ingestion { stage, source: Box::new(self) }
    }
}

impl From<RagError> for ragloom_graph::NodeError {
    fn from(error: RagError) -> Self {
        ragloom_graph::NodeError::failed(error)
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

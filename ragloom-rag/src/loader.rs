//! Document loaders.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Metadata key recording where a document was loaded from.
pub const SOURCE_KEY: &str = "_source";
pub const FILE_NAME_KEY: &str = "_file_name";
pub const EXTENSION_KEY: &str = "_extension";

/// Where a loader should read documents from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A local file path.
    Path(PathBuf),
    /// Inline text, useful for tests and programmatic ingestion.
    Text(String),
}

impl Source {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// A human-readable identifier for logs and errors.
    pub fn uri(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Text(_) => "inline".to_string(),
        }
    }
}

/// Turns a [`Source`] into documents.
#[async_trait]
pub trait Loader: Send + Sync {
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if the source is missing or unreadable.
    async fn load(&self, source: &Source) -> Result<Vec<Document>>;
}

/// Reads one UTF-8 file into one document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }
}

fn file_metadata(document: Document, path: &Path) -> Document {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
    document
        .with_metadata(SOURCE_KEY, Value::String(path.display().to_string()))
        .with_metadata(FILE_NAME_KEY, file_name)
        .with_metadata(EXTENSION_KEY, extension)
}

#[async_trait]
impl Loader for FileLoader {
    async fn load(&self, source: &Source) -> Result<Vec<Document>> {
        match source {
            Source::Text(text) => Ok(vec![Document::new(text.clone())]),
            Source::Path(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| RagError::Load {
                    source_uri: source.uri(),
                    message: e.to_string(),
                })?;
                debug!(source = %path.display(), bytes = content.len(), "loaded file");
                Ok(vec![file_metadata(Document::new(content), path)])
            }
        }
    }
}

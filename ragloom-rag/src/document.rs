//! Data types for documents, chunks, and stored points.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Ordered key-value metadata.
pub type Metadata = serde_json::Map<String, Value>;

/// Payload key holding a chunk's text. Always present on stored points.
pub const CONTENT_KEY: &str = "content";
/// Payload key holding the id of the chunk's parent document.
pub const DOCUMENT_ID_KEY: &str = "document_id";
/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key holding the similarity score of a retrieved document.
pub const SCORE_KEY: &str = "score";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub content: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with a freshly generated id.
    pub fn new(content: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4().to_string(), content: content.into(), metadata: Metadata::new() }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The similarity score assigned at retrieval time, if any.
    pub fn score(&self) -> Option<f32> {
        self.metadata.get(SCORE_KEY).and_then(Value::as_f64).map(|s| s as f32)
    }
}

/// A bounded span of a [`Document`], the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Fresh UUID, independent of the parent document's id.
    pub id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: Metadata,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Pair this chunk with its embedding as a point ready for storage.
    ///
    /// The payload carries the chunk metadata plus the reserved
    /// [`CONTENT_KEY`] and [`DOCUMENT_ID_KEY`] entries.
    pub fn into_point(self, vector: Vec<f32>) -> StoredPoint {
        let mut payload = self.metadata;
        payload.insert(DOCUMENT_ID_KEY.to_string(), Value::String(self.document_id));
        payload.insert(CONTENT_KEY.to_string(), Value::String(self.content));
        StoredPoint { id: self.id, vector, payload }
    }
}

/// The persisted unit in a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPoint {
    /// UUID string.
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Metadata,
}

/// A stored point returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub payload: Metadata,
    /// Cosine similarity; higher is more relevant.
    pub score: f32,
}

impl ScoredPoint {
    /// Convert into a retrieved [`Document`] whose metadata carries [`SCORE_KEY`].
    pub fn into_document(mut self) -> Document {
        let content = match self.payload.remove(CONTENT_KEY) {
            Some(Value::String(content)) => content,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let mut metadata = self.payload;
        metadata.insert(SCORE_KEY.to_string(), Value::from(f64::from(self.score)));
        Document { id: self.id, content, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_payload_round_trips_into_retrieved_document() {
        let chunk = Chunk {
            id: "c1".into(),
            content: "Rust is fast.".into(),
            metadata: Metadata::from_iter([("topic".to_string(), Value::from("rust"))]),
            document_id: "d1".into(),
        };
        let point = chunk.into_point(vec![1.0, 0.0]);
        assert_eq!(point.payload[CONTENT_KEY], "Rust is fast.");
        assert_eq!(point.payload[DOCUMENT_ID_KEY], "d1");

        let document =
            ScoredPoint { id: point.id, payload: point.payload, score: 0.5 }.into_document();
        assert_eq!(document.content, "Rust is fast.");
        assert_eq!(document.metadata["topic"], "rust");
        assert_eq!(document.score(), Some(0.5));
        assert!(!document.metadata.contains_key(CONTENT_KEY));
    }

    #[test]
    fn metadata_keeps_insertion_order() {
        let document = Document::new("text")
            .with_metadata("source", "notes.md")
            .with_metadata("author", "ferris")
            .with_metadata("chapter", 3);
        let keys: Vec<&str> = document.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, ["source", "author", "chapter"]);

        let json = serde_json::to_string(&document.metadata).unwrap();
        assert_eq!(json, r#"{"source":"notes.md","author":"ferris","chapter":3}"#);
    }

    #[test]
    fn new_documents_get_distinct_ids() {
        assert_ne!(Document::new("a").id, Document::new("a").id);
    }
}

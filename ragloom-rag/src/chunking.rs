//! Document chunking.
//!
//! [`RecursiveChunker`] splits text on a priority list of separators,
//! falling back to the next separator (and finally to a hard character cut)
//! for any piece that is still too long. All lengths are counted in `char`s.

use serde_json::Value;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};
use crate::error::{RagError, Result};

/// Separators used when none are configured: paragraphs, lines, CJK sentence
/// terminators, then words.
pub const DEFAULT_SEPARATORS: [&str; 6] = ["\n\n", "\n", "。", "！", "？", " "];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty content.
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Splits text hierarchically on a list of separators with character overlap.
///
/// The text is first partitioned into base pieces of at most
/// `chunk_size - chunk_overlap` chars. Chunk `i > 0` is then the tail of
/// chunk `i - 1` (at most `chunk_overlap` chars) followed by base piece `i`,
/// so no chunk exceeds `chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// use ragloom_rag::{Chunker, RecursiveChunker, DEFAULT_SEPARATORS};
///
/// let chunker = RecursiveChunker::new(500, 100, DEFAULT_SEPARATORS)?;
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// Empty separators are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_overlap >= chunk_size`.
    pub fn new<I, S>(chunk_size: usize, chunk_overlap: usize, separators: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        let separators =
            separators.into_iter().map(Into::into).filter(|s: &String| !s.is_empty()).collect();
        Ok(Self { chunk_size, chunk_overlap, separators })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap, config.separators.iter().cloned())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        let pieces = split_pieces(text, self.chunk_size - self.chunk_overlap, &separators);

        let mut chunks: Vec<String> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let chunk = match chunks.last() {
                Some(previous) => {
                    let mut chunk = tail(previous, self.chunk_overlap).to_string();
                    chunk.push_str(&piece);
                    chunk
                }
                None => piece,
            };
            chunks.push(chunk);
        }
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        let chunks = self
            .split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(CHUNK_INDEX_KEY.to_string(), Value::from(i));
                Chunk {
                    id: Uuid::new_v4().to_string(),
                    content,
                    metadata,
                    document_id: document.id.clone(),
                }
            })
            .collect();
        Ok(chunks)
    }
}

/// Partition `text` into consecutive pieces of at most `limit` chars whose
/// concatenation is `text`.
fn split_pieces(text: &str, limit: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let Some(position) = separators.iter().position(|sep| text.contains(sep)) else {
        return hard_split(text, limit);
    };
    let remaining = &separators[position + 1..];

    let mut pieces = Vec::new();
    let mut current = String::new();
    for segment in split_keeping_separator(text, separators[position]) {
        if current.is_empty() {
            current.push_str(segment);
        } else if char_len(&current) + char_len(segment) <= limit {
            current.push_str(segment);
        } else {
            flush(&mut pieces, std::mem::take(&mut current), limit, remaining);
            current.push_str(segment);
        }
    }
    if !current.is_empty() {
        flush(&mut pieces, current, limit, remaining);
    }
    pieces
}

fn flush(pieces: &mut Vec<String>, piece: String, limit: usize, separators: &[&str]) {
    if char_len(&piece) > limit {
        pieces.extend(split_pieces(&piece, limit, separators));
    } else {
        pieces.push(piece);
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn hard_split(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(limit).map(|c| c.iter().collect()).collect()
}

/// The last `n` chars of `text` (all of it when shorter).
fn tail(text: &str, n: usize) -> &str {
    let skip = char_len(text).saturating_sub(n);
    match text.char_indices().nth(skip) {
        Some((index, _)) => &text[index..],
        None => "",
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_stays_with_preceding_piece() {
        let chunker = RecursiveChunker::new(4, 0, ["."]).unwrap();
        assert_eq!(chunker.split_text("A. B. C."), vec!["A.", " B.", " C."]);
    }

    #[test]
    fn overlap_prefixes_the_previous_tail() {
        let chunker = RecursiveChunker::new(6, 2, [" "]).unwrap();
        let chunks = chunker.split_text("aaa bbb ccc");
        assert_eq!(chunks, vec!["aaa ", "a bbb ", "b ccc"]);
    }

    #[test]
    fn multibyte_separators_are_counted_in_chars() {
        let chunker = RecursiveChunker::new(4, 0, ["。"]).unwrap();
        assert_eq!(chunker.split_text("你好。世界。"), vec!["你好。", "世界。"]);
    }

    #[test]
    fn falls_back_to_hard_split_without_separators() {
        let chunker = RecursiveChunker::new(3, 0, Vec::<String>::new()).unwrap();
        assert_eq!(chunker.split_text("abcdefg"), vec!["abc", "def", "g"]);
    }

    #[test]
    fn tail_handles_short_and_multibyte_text() {
        assert_eq!(tail("héllo", 3), "llo");
        assert_eq!(tail("ab", 5), "ab");
        assert_eq!(tail("ab", 0), "");
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        assert!(matches!(RecursiveChunker::new(10, 10, DEFAULT_SEPARATORS), Err(RagError::Config(_))));
    }
}

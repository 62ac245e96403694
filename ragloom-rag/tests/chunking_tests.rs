//! Property tests for the recursive chunker.

use std::collections::HashSet;

use proptest::prelude::*;
use ragloom_rag::document::CHUNK_INDEX_KEY;
use ragloom_rag::{Chunker, DEFAULT_SEPARATORS, Document, RagConfig, RagError, RecursiveChunker};

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Drop each chunk's overlap prefix and concatenate.
fn reconstruct(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let skip = if i == 0 { 0 } else { overlap.min(char_len(&chunks[i - 1])) };
        text.extend(chunk.chars().skip(skip));
    }
    text
}

fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-z]{1,12}",
            Just(" ".to_string()),
            Just("\n".to_string()),
            Just("\n\n".to_string()),
            Just("。".to_string()),
            Just("！".to_string()),
            "[日本語]{1,5}",
        ],
        0..60,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_respect_size_and_reconstruct_the_source(
        text in arb_text(),
        chunk_size in 2usize..80,
        overlap_ratio in 0.0f64..0.9,
    ) {
        let overlap = ((chunk_size as f64) * overlap_ratio) as usize;
        prop_assume!(overlap < chunk_size);
        let chunker = RecursiveChunker::new(chunk_size, overlap, DEFAULT_SEPARATORS).unwrap();

        let chunks = chunker.split_text(&text);

        for chunk in &chunks {
            prop_assert!(char_len(chunk) <= chunk_size, "chunk {:?} exceeds {}", chunk, chunk_size);
        }
        prop_assert_eq!(reconstruct(&chunks, overlap), text);
    }
}

#[test]
fn splits_on_configured_separator() {
    let chunker = RecursiveChunker::new(4, 0, ["."]).unwrap();
    let chunks = chunker.chunk(&Document::new("A. B. C.").with_id("doc")).unwrap();

    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, ["A.", " B.", " C."]);

    let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.document_id, "doc");
        assert_eq!(chunk.metadata[CHUNK_INDEX_KEY], i);
    }
}

#[test]
fn chunks_inherit_document_metadata() {
    let chunker = RecursiveChunker::from_config(&RagConfig::default()).unwrap();
    let document = Document::new("short text").with_metadata("lang", "en");
    let chunks = chunker.chunk(&document).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata["lang"], "en");
}

#[test]
fn empty_document_yields_no_chunks() {
    let chunker = RecursiveChunker::new(10, 2, DEFAULT_SEPARATORS).unwrap();
    assert!(chunker.chunk(&Document::new("")).unwrap().is_empty());
}

#[test]
fn overlap_must_be_smaller_than_size() {
    let err = RecursiveChunker::new(5, 8, DEFAULT_SEPARATORS).unwrap_err();
    assert!(matches!(err, RagError::Config(_)));
}

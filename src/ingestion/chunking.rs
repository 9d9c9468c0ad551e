//! Document splitting into overlapping chunks.
//!
//! Splitting is semantic first (`semchunk-rs` breaks at paragraph, sentence, then word
//! boundaries) with a hard length budget, then a sliding overlap copies the tail of each chunk
//! onto the head of the next. Length is measured in characters by default or in `cl100k_base`
//! tokens when configured.

use super::types::{ChunkingError, Document, DocumentKind};
use crate::config::{IngestionSettings, LengthFunction};
use crate::pinecone::compute_chunk_hash;
use semchunk_rs::Chunker;
use std::collections::HashSet;
use std::sync::Arc;
use tiktoken_rs::cl100k_base;

type LengthCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Splitter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum chunk length.
    pub chunk_size: usize,
    /// Length carried over from the previous chunk.
    pub chunk_overlap: usize,
    /// Unit of `chunk_size` and `chunk_overlap`.
    pub length_function: LengthFunction,
}

impl From<&IngestionSettings> for SplitterConfig {
    fn from(settings: &IngestionSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            length_function: settings.length_function,
        }
    }
}

/// Chunk ready for embedding, carrying its document's provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChunk {
    /// Chunk text content.
    pub text: String,
    /// Provenance inherited from the source document.
    pub kind: DocumentKind,
    /// Filename inherited from the source document.
    pub source: String,
    /// Stable digest used for dedupe.
    pub chunk_hash: String,
}

/// Split every document and drop duplicate chunks, returning the chunks and the skip count.
pub fn split_documents(
    documents: &[Document],
    config: SplitterConfig,
) -> Result<(Vec<PreparedChunk>, usize), ChunkingError> {
    if config.chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    let counter = build_counter(config.length_function)?;

    let mut chunks = Vec::new();
    for document in documents {
        for text in chunk_text_with_counter(
            &document.page_content,
            config.chunk_size,
            config.chunk_overlap,
            &counter,
        ) {
            chunks.push((text, document.kind, document.source.clone()));
        }
    }
    Ok(dedupe_chunks(chunks))
}

fn build_counter(length_function: LengthFunction) -> Result<LengthCounter, ChunkingError> {
    match length_function {
        LengthFunction::Characters => Ok(Arc::new(|segment: &str| segment.chars().count())),
        LengthFunction::Tokens => {
            let encoding = Arc::new(cl100k_base().map_err(ChunkingError::Tokenizer)?);
            Ok(Arc::new(move |segment: &str| {
                encoding.encode_ordinary(segment).len()
            }))
        }
    }
}

/// Remove duplicate chunks across the upload, keeping the first occurrence.
fn dedupe_chunks(chunks: Vec<(String, DocumentKind, String)>) -> (Vec<PreparedChunk>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for (text, kind, source) in chunks {
        if text.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&text);
        if seen.insert(hash.clone()) {
            prepared.push(PreparedChunk {
                text,
                kind,
                source,
                chunk_hash: hash,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: &LengthCounter,
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let counter_for_chunker = Arc::clone(counter);
    let chunker = Chunker::new(
        chunk_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    apply_overlap(chunker.chunk(text), chunk_size, overlap, counter)
}

/// Prefix each chunk with up to `overlap` units from the end of its predecessor.
///
/// The combined chunk is trimmed from the front so it never exceeds `chunk_size`.
fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &LengthCounter,
) -> Vec<String> {
    let overlap = overlap.min(chunk_size.saturating_sub(1));
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut iter = chunks.into_iter();
    let Some(mut previous) = iter.next() else {
        return Vec::new();
    };
    let mut overlapped = vec![previous.clone()];

    for current in iter {
        let tail = tail_within(&previous, overlap, counter);
        let mut combined = String::with_capacity(tail.len() + current.len() + 1);
        if !tail.is_empty() {
            combined.push_str(tail);
            if !tail.ends_with(char::is_whitespace) && !current.starts_with(char::is_whitespace) {
                combined.push(' ');
            }
        }
        combined.push_str(&current);
        overlapped.push(tail_within(&combined, chunk_size, counter).to_string());
        previous = current;
    }

    overlapped
}

/// Longest suffix of `text` (starting at a non-whitespace char) whose length fits `limit`.
fn tail_within<'a>(text: &'a str, limit: usize, counter: &LengthCounter) -> &'a str {
    if limit == 0 {
        return "";
    }
    for (offset, _) in text.char_indices() {
        let candidate = text[offset..].trim_start();
        if counter.as_ref()(candidate) <= limit {
            return candidate;
        }
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_counter() -> LengthCounter {
        Arc::new(|segment: &str| segment.split_whitespace().count())
    }

    fn characters() -> LengthCounter {
        build_counter(LengthFunction::Characters).expect("counter")
    }

    #[test]
    fn chunks_respect_budget_and_overlap() {
        let text = "one two three four five";
        let chunks = chunk_text_with_counter(text, 3, 1, &word_counter());
        assert_eq!(chunks, vec!["one two three", "three four five"]);
    }

    #[test]
    fn zero_overlap_leaves_chunks_untouched() {
        let chunks = chunk_text_with_counter("one two three four five", 2, 0, &word_counter());
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn character_budget_is_never_exceeded() {
        let paragraph = "Sound is a mechanical wave that needs a medium to travel. ".repeat(40);
        let counter = characters();
        let chunks = chunk_text_with_counter(&paragraph, 200, 50, &counter);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn tail_within_starts_at_word_boundary_when_possible() {
        let counter = characters();
        assert_eq!(tail_within("alpha beta", 4, &counter), "beta");
        assert_eq!(tail_within("alpha beta", 100, &counter), "alpha beta");
        assert_eq!(tail_within("alpha", 0, &counter), "");
    }

    #[test]
    fn documents_split_with_provenance_and_dedupe() {
        let documents = vec![
            Document::new("Refraction bends light.", DocumentKind::TitleSummary, "a.pdf"),
            Document::new("Refraction bends light.", DocumentKind::TextSummary, "b.pdf"),
            Document::new("   ", DocumentKind::TextSummary, "b.pdf"),
            Document::new("Lenses focus light.", DocumentKind::Docx, "c.docx"),
        ];
        let (chunks, skipped) = split_documents(
            &documents,
            SplitterConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                length_function: LengthFunction::Characters,
            },
        )
        .expect("chunks");

        assert_eq!(skipped, 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].kind, DocumentKind::TitleSummary);
        assert_eq!(chunks[0].source, "a.pdf");
        assert_eq!(chunks[1].kind, DocumentKind::Docx);
        assert_eq!(chunks[1].chunk_hash, compute_chunk_hash("Lenses focus light."));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = split_documents(
            &[],
            SplitterConfig {
                chunk_size: 0,
                chunk_overlap: 0,
                length_function: LengthFunction::Characters,
            },
        )
        .unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn token_budget_uses_cl100k() {
        let counter = build_counter(LengthFunction::Tokens).expect("counter");
        let text = "The quick brown fox jumps over the lazy dog.";
        let chunks = chunk_text_with_counter(text, 5, 0, &counter);
        for chunk in &chunks {
            assert!(counter.as_ref()(chunk) <= 5);
        }
        let words: Vec<&str> = chunks.iter().flat_map(|chunk| chunk.split_whitespace()).collect();
        assert_eq!(words, text.split_whitespace().collect::<Vec<_>>());
    }
}

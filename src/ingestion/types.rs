//! Core data types and error definitions for the ingestion pipeline.

use crate::embedding::EmbeddingClientError;
use crate::llm::LlmError;
use crate::pinecone::PineconeError;
use crate::prompts::PromptError;
use anyhow::Error as TokenizerError;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// A file received from an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename, used for type detection and as the `source` metadata value.
    pub filename: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Pair a filename with its contents.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Detect the supported file type from the extension, case-insensitively.
    pub fn kind(&self) -> Option<FileKind> {
        let extension = Path::new(&self.filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            _ => None,
        }
    }
}

/// File formats the pipeline knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Portable Document Format; partitioned and summarized.
    Pdf,
    /// Word document; text stored directly.
    Docx,
}

/// Provenance tag stored under the `type` metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Summary of a table.
    TableSummary,
    /// Summary of a page header.
    HeaderSummary,
    /// Summary of a page footer.
    FooterSummary,
    /// Summary of a title or heading.
    TitleSummary,
    /// Summary of narrative prose.
    NarrativeTextSummary,
    /// Summary of uncategorized text.
    TextSummary,
    /// Summary of a list item.
    ListItemSummary,
    /// Summary of an embedded image.
    ImageSummary,
    /// Raw text of a Word document.
    Docx,
}

impl DocumentKind {
    /// Metadata value for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TableSummary => "table_summary",
            Self::HeaderSummary => "header_summary",
            Self::FooterSummary => "footer_summary",
            Self::TitleSummary => "title_summary",
            Self::NarrativeTextSummary => "narrative_text_summary",
            Self::TextSummary => "text_summary",
            Self::ListItemSummary => "list_item_summary",
            Self::ImageSummary => "image_summary",
            Self::Docx => "docx",
        }
    }
}

/// Unit of text headed for the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Summary or raw text.
    pub page_content: String,
    /// Provenance tag.
    pub kind: DocumentKind,
    /// Filename the content came from.
    pub source: String,
}

impl Document {
    /// Build a document.
    pub fn new(page_content: impl Into<String>, kind: DocumentKind, source: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            kind,
            source: source.into(),
        }
    }
}

/// Summary of a completed upload produced by [`crate::ingestion::IngestionApi::run_pipeline`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Documents produced from the upload (summaries plus DOCX bodies).
    pub documents: usize,
    /// Chunks written to the index.
    pub chunks_indexed: usize,
    /// Identical chunks dropped before embedding.
    pub duplicate_chunks: usize,
    /// Files ignored because their type is unsupported.
    pub skipped_files: Vec<String>,
}

/// Errors produced while splitting documents into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible size budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable.
    #[error("failed to initialize tokenizer: {0}")]
    Tokenizer(#[source] TokenizerError),
}

/// Errors raised while reading a PDF.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The PDF could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Errors raised while reading a DOCX archive.
#[derive(Debug, Error)]
pub enum DocxError {
    /// The file is not a valid zip archive.
    #[error("invalid DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// `word/document.xml` could not be read.
    #[error("failed to read document body: {0}")]
    Io(#[from] std::io::Error),
    /// Document XML was malformed.
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// A PDF failed to partition.
    #[error("Failed to partition {file}: {source}")]
    Partition {
        /// Offending upload.
        file: String,
        /// Underlying parse error.
        #[source]
        source: PartitionError,
    },
    /// A DOCX failed to load.
    #[error("Failed to load {file}: {source}")]
    Docx {
        /// Offending upload.
        file: String,
        /// Underlying archive error.
        #[source]
        source: DocxError,
    },
    /// A summarization prompt could not be rendered.
    #[error("Failed to build summarization prompt: {0}")]
    Prompt(#[from] PromptError),
    /// The chat model failed while summarizing a bucket.
    #[error("Failed to summarize {bucket}: {source}")]
    Summarization {
        /// Bucket being summarized.
        bucket: &'static str,
        /// Underlying model error.
        #[source]
        source: LlmError,
    },
    /// Chunking failed.
    #[error("Failed to chunk documents: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector index interaction failed.
    #[error("Vector index request failed: {0}")]
    Index(#[from] PineconeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_detection_ignores_case() {
        assert_eq!(UploadedFile::new("Chapter1.PDF", Vec::new()).kind(), Some(FileKind::Pdf));
        assert_eq!(UploadedFile::new("notes.docx", Vec::new()).kind(), Some(FileKind::Docx));
        assert_eq!(UploadedFile::new("notes.txt", Vec::new()).kind(), None);
        assert_eq!(UploadedFile::new("README", Vec::new()).kind(), None);
    }

    #[test]
    fn document_kinds_serialize_to_metadata_values() {
        for kind in [
            DocumentKind::TableSummary,
            DocumentKind::NarrativeTextSummary,
            DocumentKind::ListItemSummary,
            DocumentKind::Docx,
        ] {
            let serialized = serde_json::to_value(kind).expect("serialize");
            assert_eq!(serialized, kind.as_str());
        }
    }
}

//! Upload ingestion: partitioning, summarization, chunking, embedding, and indexing.

pub mod chunking;
pub mod docx;
pub mod elements;
pub mod partition;
mod service;
pub mod summarize;
pub mod types;

pub use elements::{Element, ElementBuckets, ElementCategory};
pub use service::{IngestionApi, IngestionService};
pub use types::{
    ChunkingError, Document, DocumentKind, DocxError, FileKind, IngestOutcome, IngestionError,
    PartitionError, UploadedFile,
};

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and query activity.
#[derive(Default)]
pub struct ServiceMetrics {
    uploads_processed: AtomicU64,
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed upload with the number of documents and chunks it produced.
    pub fn record_upload(&self, documents: u64, chunks: u64) {
        self.uploads_processed.fetch_add(1, Ordering::Relaxed);
        self.documents_ingested
            .fetch_add(documents, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record an answered question.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads_processed: self.uploads_processed.load(Ordering::Relaxed),
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Upload requests that completed ingestion since startup.
    pub uploads_processed: u64,
    /// Documents (summaries and DOCX bodies) produced by those uploads.
    pub documents_ingested: u64,
    /// Chunks written to the vector index.
    pub chunks_indexed: u64,
    /// Questions answered through the conversation graph.
    pub questions_answered: u64,
}

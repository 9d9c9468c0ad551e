//! Pinecone vector index integration.

pub mod client;
pub mod payload;
pub mod types;

pub use client::PineconeService;
pub use payload::{compute_chunk_hash, relevance_score};
pub use types::{IndexDescription, IndexSpec, PineconeError, ScoredMatch, VectorRecord};

#![deny(missing_docs)]

//! Core library for the physicsbot study assistant.

/// Tool-routing conversation graph and the study tools it dispatches to.
pub mod agent;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment and settings-file configuration.
pub mod config;
/// Embedding client abstraction and the Google adapter.
pub mod embedding;
/// Upload ingestion: partitioning, summarization, chunking, and indexing.
pub mod ingestion;
/// Chat model abstraction with Gemini and Groq adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query counters.
pub mod metrics;
/// Pinecone vector index integration.
pub mod pinecone;
/// Prompt templates used by summarization and the study tools.
pub mod prompts;

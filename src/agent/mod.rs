//! Question answering through a tool-routing conversation graph.
//!
//! The graph alternates between a `chatbot` node, which asks the model for the next turn with
//! the study tools bound, and a `tools` node, which runs every call the model requested and
//! feeds the results back. The loop ends when the model answers without calling a tool.

mod graph;
mod retriever;
mod service;
mod state;
mod tools;

pub use graph::StudyGraph;
pub use retriever::{ContextRetriever, Retriever};
pub use service::{QueryApi, QueryService};
pub use state::{GraphState, Message};
pub use tools::{
    AnswerQueryTool, GenerateImportantQuestionsTool, RagToolSchema, StudyTool,
    SummarizeChapterTool, Toolbox,
};

use crate::embedding::EmbeddingClientError;
use crate::llm::LlmError;
use crate::pinecone::PineconeError;
use crate::prompts::PromptError;
use thiserror::Error;

/// Errors raised while answering a question.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Question was blank after trimming.
    #[error("Question must not be empty")]
    EmptyQuestion,
    /// Chat model call failed.
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// Question embedding failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Similarity search failed.
    #[error(transparent)]
    Index(#[from] PineconeError),
    /// Prompt template could not be rendered.
    #[error(transparent)]
    Prompt(#[from] PromptError),
    /// Graph kept looping past the configured number of node executions.
    #[error("Conversation exceeded {0} steps without a final answer")]
    StepLimit(usize),
}

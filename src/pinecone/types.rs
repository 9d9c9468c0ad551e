//! Shared types used by the Pinecone client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Index never reported ready within the polling budget.
    #[error("Index {0} did not become ready in time")]
    NotReady(String),
    /// Index exists but has a different dimension than the embeddings we produce.
    #[error("Index {name} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// Index name.
        name: String,
        /// Configured embedding dimension.
        expected: usize,
        /// Dimension reported by Pinecone.
        actual: usize,
    },
    /// Index was expected to exist but could not be found.
    #[error("Index {0} not found")]
    IndexNotFound(String),
}

/// Parameters used to create a serverless index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Vector dimension.
    pub dimension: usize,
    /// Similarity metric (`cosine`, `euclidean`, `dotproduct`).
    pub metric: String,
    /// Serverless cloud.
    pub cloud: String,
    /// Serverless region.
    pub region: String,
}

/// Index description returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    /// Index name.
    pub name: String,
    /// Vector dimension.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Similarity metric.
    #[serde(default)]
    pub metric: Option<String>,
    /// Data-plane host (without scheme).
    #[serde(default)]
    pub host: String,
    /// Provisioning status.
    #[serde(default)]
    pub status: IndexStatus,
}

/// Provisioning status of an index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    /// Whether the index accepts reads and writes.
    #[serde(default)]
    pub ready: bool,
    /// Free-form state such as `Initializing` or `Ready`.
    #[serde(default)]
    pub state: String,
}

/// Vector written to the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Record identifier.
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Metadata stored with the vector.
    pub metadata: Map<String, Value>,
}

/// Scored match returned by a similarity query.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredMatch {
    /// Record identifier.
    pub id: String,
    /// Raw similarity score reported by Pinecone.
    pub score: f32,
    /// Metadata stored with the vector.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ScoredMatch {
    /// The chunk body stored under the `text` metadata key, if any.
    pub fn text(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("text"))
            .and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
pub(crate) struct ListIndexesResponse {
    #[serde(default)]
    pub(crate) indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) matches: Vec<ScoredMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertResponse {
    #[serde(default)]
    pub(crate) upserted_count: usize,
}

//! Embedding client abstraction and the Google Generative Language adapter.
//!
//! Documents are embedded with the `RETRIEVAL_DOCUMENT` task type and questions with
//! `RETRIEVAL_QUERY`, so both sides of a similarity search live in the same space.

use crate::config::{Config, get_config};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

/// Maximum number of texts the batch endpoint accepts per request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider answered with a payload we could not interpret.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Returned vector length did not match the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was created with.
        expected: usize,
        /// Dimension the provider returned.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text, preserving order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Embed a single search question.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Embedding client backed by the `batchEmbedContents` endpoint.
pub struct GoogleEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl GoogleEmbeddingClient {
    /// Build a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        let http = Client::builder()
            .user_agent("physicsbot/embedding")
            .build()
            .map_err(|error| EmbeddingClientError::GenerationFailed(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.google_api_base_url.clone(),
            api_key: config.google_api_key.clone(),
            model: qualified_model_name(&config.settings.embedding_model.model_name),
            dimension: config.settings.vector_db.dimension,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:batchEmbedContents",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        task_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task_type,
                    "outputDimensionality": self.dimension,
                })
            })
            .collect();

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::GenerationFailed(format!(
                    "failed to reach embedding endpoint: {error}"
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingClientError::InvalidResponse(error.to_string()))?;

        if body.embeddings.len() != texts.len() {
            return Err(EmbeddingClientError::InvalidResponse(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                body.embeddings.len()
            )));
        }

        body.embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.values.len() == self.dimension {
                    Ok(embedding.values)
                } else {
                    Err(EmbeddingClientError::DimensionMismatch {
                        expected: self.dimension,
                        actual: embedding.values.len(),
                    })
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for GoogleEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        tracing::debug!(
            model = %self.model,
            dimension = self.dimension,
            texts = texts.len(),
            "Generating embeddings"
        );

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch, "RETRIEVAL_DOCUMENT").await?);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self
            .embed_batch(&[text.to_string()], "RETRIEVAL_QUERY")
            .await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingClientError::InvalidResponse("empty embedding list".into()))
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client() -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    Ok(Arc::new(GoogleEmbeddingClient::from_config(get_config())?))
}

fn qualified_model_name(name: &str) -> String {
    if name.starts_with("models/") {
        name.to_string()
    } else {
        format!("models/{name}")
    }
}

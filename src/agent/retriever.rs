use super::AgentError;
use crate::embedding::EmbeddingClient;
use crate::pinecone::{PineconeService, relevance_score};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of textbook context for a question.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Passages relevant to `question`, joined with blank lines (empty when nothing qualifies).
    async fn context(&self, question: &str) -> Result<String, AgentError>;
}

/// Similarity search with a relevance cut-off over the indexed chunks.
pub struct Retriever {
    embedding_client: Arc<dyn EmbeddingClient>,
    index: Arc<PineconeService>,
    top_k: usize,
    score_threshold: f32,
}

impl Retriever {
    /// Create a retriever returning at most `top_k` passages scoring `>= score_threshold`.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<PineconeService>,
        top_k: usize,
        score_threshold: f32,
    ) -> Self {
        Self {
            embedding_client,
            index,
            top_k,
            score_threshold,
        }
    }

    /// Texts of matching chunks in score order.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<String>, AgentError> {
        let vector = self.embedding_client.embed_query(question).await?;
        let matches = self.index.query(vector, self.top_k).await?;
        let metric = self.index.metric();
        let total = matches.len();

        let passages: Vec<String> = matches
            .iter()
            .filter(|candidate| relevance_score(metric, candidate.score) >= self.score_threshold)
            .filter_map(|candidate| candidate.text().map(str::to_string))
            .collect();

        tracing::debug!(
            matches = total,
            kept = passages.len(),
            threshold = self.score_threshold,
            "Retrieved passages"
        );
        if passages.is_empty() {
            tracing::warn!("No relevant passages met the score threshold");
        }
        Ok(passages)
    }
}

#[async_trait]
impl ContextRetriever for Retriever {
    async fn context(&self, question: &str) -> Result<String, AgentError> {
        Ok(self.retrieve(question).await?.join("\n\n"))
    }
}

use super::graph::StudyGraph;
use super::retriever::Retriever;
use super::state::GraphState;
use super::tools::Toolbox;
use super::AgentError;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::llm::{LlmError, load_llm};
use crate::pinecone::PineconeService;
use async_trait::async_trait;
use std::sync::Arc;

/// Abstraction over question answering used by the HTTP surface.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Answer a single question.
    async fn answer(&self, question: String) -> Result<String, AgentError>;
}

/// Answers questions by running the study graph from a single user message.
pub struct QueryService {
    graph: StudyGraph,
}

impl QueryService {
    /// Wrap a prepared graph.
    pub fn new(graph: StudyGraph) -> Self {
        Self { graph }
    }

    /// Build the graph from configuration, sharing the embedding client and index handle.
    pub fn from_config(
        config: &Config,
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<PineconeService>,
    ) -> Result<Self, LlmError> {
        let llm = load_llm(config)?;
        let retriever = Retriever::new(
            embedding_client,
            index,
            config.settings.retriever.top_k,
            config.settings.retriever.score_threshold,
        );
        tracing::info!(
            model = llm.model_name(),
            top_k = config.settings.retriever.top_k,
            score_threshold = config.settings.retriever.score_threshold,
            "Query graph ready"
        );
        let toolbox = Toolbox::study_tools(Arc::new(retriever), llm.clone());
        Ok(Self::new(StudyGraph::new(
            llm,
            toolbox,
            config.settings.agent.max_steps,
        )))
    }
}

#[async_trait]
impl QueryApi for QueryService {
    async fn answer(&self, question: String) -> Result<String, AgentError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AgentError::EmptyQuestion);
        }
        let state = self.graph.run(GraphState::from_question(question)).await?;
        Ok(state.final_answer().unwrap_or_default().to_string())
    }
}

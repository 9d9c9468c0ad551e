//! Chat model abstraction with Gemini and Groq adapters.
//!
//! Every caller works with [`ChatModel`] and the provider-neutral types in [`types`]; the
//! adapters translate those into each provider's REST payloads.

mod gemini;
mod groq;
/// Provider-neutral request and response types.
pub mod types;

pub use gemini::GeminiChatModel;
pub use groq::GroqChatModel;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Part, Role, ToolCall, ToolDeclaration};

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by chat model adapters.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider name in configuration is not supported.
    #[error("Unsupported model provider: {0}")]
    UnknownProvider(String),
    /// Provider requires an API key that was not configured.
    #[error("Missing API key for provider {0}")]
    MissingApiKey(String),
    /// Provider could not be reached.
    #[error("Model provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error status.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be interpreted.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Request used a capability the provider adapter does not support.
    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

/// Interface implemented by chat completion providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier used for logging.
    fn model_name(&self) -> &str;

    /// Run one completion over the supplied conversation.
    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Convenience wrapper: single user prompt in, trimmed text out.
    async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        let response = self.generate(ChatRequest::from_prompt(prompt)).await?;
        Ok(response.text.trim().to_string())
    }
}

/// Load the chat model registered under `provider` (`google` or `groq`).
pub fn load_chat_model(provider: &str, config: &Config) -> Result<Arc<dyn ChatModel>, LlmError> {
    match provider {
        "google" => Ok(Arc::new(GeminiChatModel::new(
            http_client()?,
            &config.google_api_base_url,
            &config.google_api_key,
            &config.settings.llm.google.model_name,
        ))),
        "groq" => {
            let api_key = config
                .groq_api_key
                .as_deref()
                .ok_or_else(|| LlmError::MissingApiKey("groq".into()))?;
            Ok(Arc::new(GroqChatModel::new(
                http_client()?,
                &config.groq_api_base_url,
                api_key,
                &config.settings.llm.groq.model_name,
            )))
        }
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

/// Load the Google model used by the conversation graph and the study tools.
pub fn load_llm(config: &Config) -> Result<Arc<dyn ChatModel>, LlmError> {
    load_chat_model("google", config)
}

/// Load the vision-capable model used for image summaries.
pub fn load_vision_model(config: &Config) -> Result<Arc<dyn ChatModel>, LlmError> {
    Ok(Arc::new(GeminiChatModel::new(
        http_client()?,
        &config.google_api_base_url,
        &config.google_api_key,
        &config.settings.ingestion.image_model,
    )))
}

fn http_client() -> Result<Client, LlmError> {
    Client::builder()
        .user_agent("physicsbot/llm")
        .build()
        .map_err(|error| LlmError::ProviderUnavailable(error.to_string()))
}

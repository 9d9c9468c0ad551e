//! Runtime configuration.
//!
//! Secrets and endpoints come from the process environment (optionally seeded from `.env`);
//! model names, index layout, and retriever parameters come from a TOML settings file located at
//! `PHYSICSBOT_CONFIG` or `config/config.toml`.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Environment variables that must be present for the server to start.
pub const REQUIRED_VARIABLES: [&str; 2] = ["GOOGLE_API_KEY", "PINECONE_API_KEY"];

const DEFAULT_SETTINGS_PATH: &str = "config/config.toml";
const DEFAULT_GOOGLE_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";
const DEFAULT_GROQ_API_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Errors encountered while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables were absent or blank.
    #[error("Missing environment variables: {0:?}")]
    MissingVariables(Vec<String>),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Settings file could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        /// Path we attempted to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Settings file was not valid TOML for [`Settings`].
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// Settings were syntactically valid but semantically inconsistent.
    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Runtime configuration for the physicsbot server.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the Google Generative Language API (chat and embeddings).
    pub google_api_key: String,
    /// API key for Pinecone.
    pub pinecone_api_key: String,
    /// Optional API key for Groq, required only when Groq is selected as chat provider.
    pub groq_api_key: Option<String>,
    /// Base URL of the Google Generative Language API.
    pub google_api_base_url: String,
    /// Base URL of the Pinecone control plane.
    pub pinecone_control_url: String,
    /// Base URL of the Groq OpenAI-compatible API.
    pub groq_api_base_url: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Values loaded from the settings file.
    pub settings: Settings,
}

/// Model names, index layout, and retrieval parameters loaded from the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Embedding model selection.
    pub embedding_model: EmbeddingModelSettings,
    /// Chat model names keyed by provider.
    pub llm: LlmSettings,
    /// Ingestion pipeline tuning.
    pub ingestion: IngestionSettings,
    /// Vector index layout.
    pub vector_db: VectorDbSettings,
    /// Similarity search parameters.
    pub retriever: RetrieverSettings,
    /// Conversation graph limits.
    pub agent: AgentSettings,
}

/// `[embedding_model]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingModelSettings {
    /// Embedding model identifier, e.g. `models/text-embedding-004`.
    pub model_name: String,
}

impl Default for EmbeddingModelSettings {
    fn default() -> Self {
        Self {
            model_name: "models/text-embedding-004".into(),
        }
    }
}

/// `[llm]` section with one table per provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `[llm.google]` model used by the agent, the tools, and (by default) summarization.
    pub google: ProviderModel,
    /// `[llm.groq]` model, available as an alternative summarization provider.
    pub groq: ProviderModel,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            google: ProviderModel {
                model_name: "gemini-1.5-flash".into(),
            },
            groq: ProviderModel {
                model_name: "llama-3.1-8b-instant".into(),
            },
        }
    }
}

/// Model name for a single chat provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderModel {
    /// Provider-specific model identifier.
    pub model_name: String,
}

/// How chunk length is measured by the text splitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthFunction {
    /// Unicode scalar count.
    #[default]
    Characters,
    /// `cl100k_base` token count.
    Tokens,
}

/// `[ingestion]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Provider key under `[llm]` used for table and text summaries.
    pub chat_provider: String,
    /// Vision-capable Google model used for image summaries.
    pub image_model: String,
    /// Pause inserted between text buckets to stay under provider rate limits.
    pub bucket_delay_secs: u64,
    /// Maximum summarization calls in flight within one bucket.
    pub summary_concurrency: usize,
    /// Maximum chunk length.
    pub chunk_size: usize,
    /// Overlap carried from the previous chunk.
    pub chunk_overlap: usize,
    /// Unit used for `chunk_size` and `chunk_overlap`.
    pub length_function: LengthFunction,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chat_provider: "google".into(),
            image_model: "gemini-1.5-flash".into(),
            bucket_delay_secs: 20,
            summary_concurrency: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            length_function: LengthFunction::Characters,
        }
    }
}

/// `[vector_db]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorDbSettings {
    /// Pinecone index name.
    pub index_name: String,
    /// Embedding dimension the index is created with.
    pub dimension: usize,
    /// Similarity metric the index is created with.
    pub metric: String,
    /// Serverless cloud provider.
    pub cloud: String,
    /// Serverless region.
    pub region: String,
    /// Namespace used for all reads and writes (empty means the default namespace).
    pub namespace: String,
}

impl Default for VectorDbSettings {
    fn default() -> Self {
        Self {
            index_name: "physics-bot".into(),
            dimension: 768,
            metric: "cosine".into(),
            cloud: "aws".into(),
            region: "us-east-1".into(),
            namespace: String::new(),
        }
    }
}

/// `[retriever]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrieverSettings {
    /// Number of matches requested from the index.
    pub top_k: usize,
    /// Minimum relevance score in `[0, 1]` a match needs to be kept.
    pub score_threshold: f32,
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            score_threshold: 0.5,
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum node executions per question before the graph gives up.
    pub max_steps: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_steps: 25 }
    }
}

impl Settings {
    /// Read and validate a settings file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make ingestion or retrieval misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_db.index_name.trim().is_empty() {
            return Err(ConfigError::Invalid("vector_db.index_name must not be empty".into()));
        }
        if self.vector_db.dimension == 0 {
            return Err(ConfigError::Invalid("vector_db.dimension must be positive".into()));
        }
        if self.retriever.top_k == 0 {
            return Err(ConfigError::Invalid("retriever.top_k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retriever.score_threshold) {
            return Err(ConfigError::Invalid(
                "retriever.score_threshold must lie in [0, 1]".into(),
            ));
        }
        if self.ingestion.chunk_size == 0 {
            return Err(ConfigError::Invalid("ingestion.chunk_size must be positive".into()));
        }
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(ConfigError::Invalid(
                "ingestion.chunk_overlap must be smaller than ingestion.chunk_size".into(),
            ));
        }
        if self.ingestion.summary_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "ingestion.summary_concurrency must be at least 1".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables and the settings file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = load_env_optional("PHYSICSBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
        let settings = Settings::load_from(&path)?;
        Self::from_lookup(load_env_optional, settings)
    }

    /// Assemble configuration from an arbitrary variable lookup and pre-loaded settings.
    pub fn from_lookup<F>(lookup: F, settings: Settings) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_VARIABLES
            .iter()
            .filter(|&&key| lookup(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing));
        }

        let groq_api_key = lookup("GROQ_API_KEY");
        if settings.ingestion.chat_provider == "groq" && groq_api_key.is_none() {
            return Err(ConfigError::MissingVariables(vec!["GROQ_API_KEY".into()]));
        }

        let server_port = lookup("SERVER_PORT")
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
            })
            .transpose()?;

        Ok(Self {
            google_api_key: lookup("GOOGLE_API_KEY").unwrap_or_default(),
            pinecone_api_key: lookup("PINECONE_API_KEY").unwrap_or_default(),
            groq_api_key,
            google_api_base_url: lookup("GOOGLE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_API_BASE_URL.into()),
            pinecone_control_url: lookup("PINECONE_CONTROL_URL")
                .unwrap_or_else(|| DEFAULT_PINECONE_CONTROL_URL.into()),
            groq_api_base_url: lookup("GROQ_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_API_BASE_URL.into()),
            server_port,
            settings,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Missing API keys or an unreadable settings file are returned to the caller, which treats
/// them as fatal.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        index = %config.settings.vector_db.index_name,
        embedding_model = %config.settings.embedding_model.model_name,
        chat_model = %config.settings.llm.google.model_name,
        chat_provider = %config.settings.ingestion.chat_provider,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

//! HTTP client wrapper for the Pinecone control and data planes.

use crate::config::Config;
use crate::pinecone::types::{
    IndexDescription, IndexSpec, ListIndexesResponse, PineconeError, QueryResponse, ScoredMatch,
    UpsertResponse, VectorRecord,
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::OnceCell;

const API_VERSION: &str = "2024-07";
/// Maximum vectors sent per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;
const READY_POLL_ATTEMPTS: u32 = 60;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lightweight HTTP client bound to a single Pinecone index.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) control_url: String,
    pub(crate) api_key: String,
    pub(crate) spec: IndexSpec,
    pub(crate) namespace: String,
    pub(crate) host: OnceCell<String>,
    pub(crate) poll_attempts: u32,
    pub(crate) poll_interval: Duration,
}

impl PineconeService {
    /// Construct a client for the index named in configuration.
    pub fn new(config: &Config) -> Result<Self, PineconeError> {
        let vector_db = &config.settings.vector_db;
        Self::from_parts(
            &config.pinecone_control_url,
            &config.pinecone_api_key,
            IndexSpec {
                name: vector_db.index_name.clone(),
                dimension: vector_db.dimension,
                metric: vector_db.metric.clone(),
                cloud: vector_db.cloud.clone(),
                region: vector_db.region.clone(),
            },
            &vector_db.namespace,
        )
    }

    /// Construct a client from explicit endpoint, credentials, and index layout.
    pub fn from_parts(
        control_url: &str,
        api_key: &str,
        spec: IndexSpec,
        namespace: &str,
    ) -> Result<Self, PineconeError> {
        let client = Client::builder().user_agent("physicsbot/0.1").build()?;
        tracing::debug!(
            control_url,
            index = %spec.name,
            "Initialized Pinecone HTTP client"
        );

        Ok(Self {
            client,
            control_url: control_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            spec,
            namespace: namespace.to_string(),
            host: OnceCell::new(),
            poll_attempts: READY_POLL_ATTEMPTS,
            poll_interval: READY_POLL_INTERVAL,
        })
    }

    /// Name of the bound index.
    pub fn index_name(&self) -> &str {
        &self.spec.name
    }

    /// Similarity metric of the bound index.
    pub fn metric(&self) -> &str {
        &self.spec.metric
    }

    /// Retrieve all indexes visible to the API key.
    pub async fn list_indexes(&self) -> Result<Vec<IndexDescription>, PineconeError> {
        let response = self
            .request(Method::GET, &format!("{}/indexes", self.control_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let error = unexpected(response).await;
            tracing::error!(error = %error, "Failed to list indexes");
            return Err(error);
        }

        let payload: ListIndexesResponse = response.json().await?;
        Ok(payload.indexes)
    }

    /// Describe an index, returning `None` when it does not exist.
    pub async fn describe_index(
        &self,
        name: &str,
    ) -> Result<Option<IndexDescription>, PineconeError> {
        let response = self
            .request(Method::GET, &format!("{}/indexes/{name}", self.control_url))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            _ => {
                let error = unexpected(response).await;
                tracing::error!(index = name, error = %error, "Index describe failed");
                Err(error)
            }
        }
    }

    /// Create a serverless index. An existing index with the same name is not an error.
    pub async fn create_index(&self, spec: &IndexSpec) -> Result<(), PineconeError> {
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric,
            "spec": {
                "serverless": { "cloud": spec.cloud, "region": spec.region }
            }
        });

        let response = self
            .request(Method::POST, &format!("{}/indexes", self.control_url))
            .json(&body)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(index = %spec.name, dimension = spec.dimension, metric = %spec.metric, "Index created");
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::debug!(index = %spec.name, "Index already exists");
                Ok(())
            }
            _ => {
                let error = unexpected(response).await;
                tracing::error!(index = %spec.name, error = %error, "Index creation failed");
                Err(error)
            }
        }
    }

    /// Create the bound index if missing and wait until it is ready.
    pub async fn ensure_index(&self) -> Result<IndexDescription, PineconeError> {
        let existing = self.list_indexes().await?;
        match existing.iter().find(|index| index.name == self.spec.name) {
            Some(index) => {
                if let Some(actual) = index.dimension
                    && actual != self.spec.dimension
                {
                    return Err(PineconeError::DimensionMismatch {
                        name: self.spec.name.clone(),
                        expected: self.spec.dimension,
                        actual,
                    });
                }
            }
            None => {
                tracing::info!(index = %self.spec.name, "Creating missing index");
                self.create_index(&self.spec).await?;
            }
        }

        let description = self.wait_until_ready().await?;
        let _ = self.host.set(data_plane_url(&description.host));
        Ok(description)
    }

    /// Write vectors in batches of [`UPSERT_BATCH_SIZE`], returning the number stored.
    pub async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, PineconeError> {
        if records.is_empty() {
            return Ok(0);
        }

        let host = self.host().await?;
        let mut upserted = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            let mut body = json!({ "vectors": batch });
            if !self.namespace.is_empty() {
                body["namespace"] = Value::String(self.namespace.clone());
            }

            let response = self
                .request(Method::POST, &format!("{host}/vectors/upsert"))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let error = unexpected(response).await;
                tracing::error!(index = %self.spec.name, error = %error, "Upsert failed");
                return Err(error);
            }

            let payload: UpsertResponse = response.json().await?;
            upserted += payload.upserted_count;
            tracing::debug!(
                index = %self.spec.name,
                batch = batch.len(),
                "Vectors upserted"
            );
        }
        Ok(upserted)
    }

    /// Return the `top_k` nearest vectors with their metadata.
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, PineconeError> {
        let host = self.host().await?;
        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        if !self.namespace.is_empty() {
            body["namespace"] = Value::String(self.namespace.clone());
        }

        let response = self
            .request(Method::POST, &format!("{host}/query"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = unexpected(response).await;
            tracing::error!(index = %self.spec.name, error = %error, "Pinecone query failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        Ok(payload.matches)
    }

    async fn host(&self) -> Result<&String, PineconeError> {
        self.host
            .get_or_try_init(|| async {
                let description = self
                    .describe_index(&self.spec.name)
                    .await?
                    .ok_or_else(|| PineconeError::IndexNotFound(self.spec.name.clone()))?;
                Ok::<_, PineconeError>(data_plane_url(&description.host))
            })
            .await
    }

    async fn wait_until_ready(&self) -> Result<IndexDescription, PineconeError> {
        for attempt in 1..=self.poll_attempts {
            if let Some(description) = self.describe_index(&self.spec.name).await?
                && description.status.ready
            {
                return Ok(description);
            }
            tracing::debug!(index = %self.spec.name, attempt, "Waiting for index to become ready");
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(PineconeError::NotReady(self.spec.name.clone()))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

async fn unexpected(response: reqwest::Response) -> PineconeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    PineconeError::UnexpectedStatus { status, body }
}

fn data_plane_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

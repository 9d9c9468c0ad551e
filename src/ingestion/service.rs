//! Ingestion service coordinating loading, summarization, chunking, embedding, and indexing.

use super::chunking::{PreparedChunk, SplitterConfig, split_documents};
use super::docx::extract_docx;
use super::elements::ElementBuckets;
use super::partition::partition_pdf;
use super::summarize::{BucketPacer, Summarizer};
use super::types::{Document, DocumentKind, FileKind, IngestOutcome, IngestionError, UploadedFile};
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::llm::{LlmError, load_chat_model, load_vision_model};
use crate::pinecone::payload::{build_metadata, current_timestamp_rfc3339, generate_vector_id};
use crate::pinecone::{PineconeService, VectorRecord};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Abstraction over the upload pipeline used by the HTTP surface.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Load, summarize, chunk, embed, and index a batch of uploaded files.
    async fn run_pipeline(&self, files: Vec<UploadedFile>) -> Result<IngestOutcome, IngestionError>;
}

/// Coordinates the full upload pipeline.
///
/// PDFs are partitioned and summarized bucket by bucket; DOCX bodies are stored verbatim. All
/// resulting documents are split, embedded, and upserted into the vector index, which is
/// created on first use. Construct once at startup and share through an `Arc`.
pub struct IngestionService {
    summarizer: Summarizer,
    embedding_client: Arc<dyn EmbeddingClient>,
    index: Arc<PineconeService>,
    splitter: SplitterConfig,
    bucket_delay: Duration,
}

impl IngestionService {
    /// Assemble a service from its collaborators.
    pub fn new(
        summarizer: Summarizer,
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<PineconeService>,
        splitter: SplitterConfig,
        bucket_delay: Duration,
    ) -> Self {
        Self {
            summarizer,
            embedding_client,
            index,
            splitter,
            bucket_delay,
        }
    }

    /// Build a service using the models and tuning named in configuration.
    pub fn from_config(
        config: &Config,
        embedding_client: Arc<dyn EmbeddingClient>,
        index: Arc<PineconeService>,
    ) -> Result<Self, LlmError> {
        let ingestion = &config.settings.ingestion;
        let chat_model = load_chat_model(&ingestion.chat_provider, config)?;
        let vision_model = load_vision_model(config)?;
        tracing::info!(
            chat_model = chat_model.model_name(),
            vision_model = vision_model.model_name(),
            "Ingestion models loaded"
        );
        Ok(Self::new(
            Summarizer::new(chat_model, vision_model, ingestion.summary_concurrency),
            embedding_client,
            index,
            SplitterConfig::from(ingestion),
            Duration::from_secs(ingestion.bucket_delay_secs),
        ))
    }

    /// Turn uploads into documents, returning them with the names of skipped files.
    pub async fn load_documents(
        &self,
        files: &[UploadedFile],
    ) -> Result<(Vec<Document>, Vec<String>), IngestionError> {
        let mut documents = Vec::new();
        let mut skipped = Vec::new();
        let mut pacer = BucketPacer::new(self.bucket_delay);

        for file in files {
            match file.kind() {
                Some(FileKind::Pdf) => {
                    let elements =
                        partition_pdf(&file.bytes).map_err(|source| IngestionError::Partition {
                            file: file.filename.clone(),
                            source,
                        })?;
                    let buckets = ElementBuckets::from_elements(&elements);
                    tracing::debug!(
                        file = %file.filename,
                        elements = elements.len(),
                        tables = buckets.tables.len(),
                        images = buckets.images.len(),
                        "PDF partitioned"
                    );
                    let summaries = self
                        .summarizer
                        .summarize_buckets(&buckets, &file.filename, &mut pacer)
                        .await?;
                    documents.extend(summaries);
                }
                Some(FileKind::Docx) => {
                    let text = extract_docx(&file.bytes).map_err(|source| IngestionError::Docx {
                        file: file.filename.clone(),
                        source,
                    })?;
                    if text.trim().is_empty() {
                        tracing::warn!(file = %file.filename, "DOCX contained no text");
                    } else {
                        documents.push(Document::new(text, DocumentKind::Docx, &file.filename));
                    }
                }
                None => {
                    tracing::warn!(file = %file.filename, "Unsupported file type");
                    skipped.push(file.filename.clone());
                }
            }
        }

        Ok((documents, skipped))
    }

    /// Split, embed, and upsert documents; returns `(chunks_indexed, duplicate_chunks)`.
    pub async fn store_in_vector_db(
        &self,
        documents: &[Document],
    ) -> Result<(usize, usize), IngestionError> {
        let (chunks, duplicates) = split_documents(documents, self.splitter)?;
        tracing::debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            duplicates,
            chunk_size = self.splitter.chunk_size,
            overlap = self.splitter.chunk_overlap,
            "Documents split"
        );
        if chunks.is_empty() {
            return Ok((0, duplicates));
        }

        self.index.ensure_index().await?;

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding_client.generate_embeddings(texts).await?;
        debug_assert_eq!(chunks.len(), embeddings.len());

        let records = build_records(chunks, embeddings);
        let indexed = self.index.upsert(records).await?;
        tracing::info!(
            index = self.index.index_name(),
            chunks = indexed,
            "Chunks indexed"
        );
        Ok((indexed, duplicates))
    }
}

fn build_records(chunks: Vec<PreparedChunk>, embeddings: Vec<Vec<f32>>) -> Vec<VectorRecord> {
    let now = current_timestamp_rfc3339();
    chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, values)| VectorRecord {
            id: generate_vector_id(),
            values,
            metadata: build_metadata(
                &chunk.text,
                chunk.kind.as_str(),
                &chunk.source,
                &chunk.chunk_hash,
                &now,
            ),
        })
        .collect()
}

#[async_trait]
impl IngestionApi for IngestionService {
    async fn run_pipeline(&self, files: Vec<UploadedFile>) -> Result<IngestOutcome, IngestionError> {
        tracing::info!(files = files.len(), "Running ingestion pipeline");
        let (documents, skipped_files) = self.load_documents(&files).await?;
        if documents.is_empty() {
            tracing::info!("No valid documents found.");
            return Ok(IngestOutcome {
                skipped_files,
                ..IngestOutcome::default()
            });
        }

        let (chunks_indexed, duplicate_chunks) = self.store_in_vector_db(&documents).await?;
        Ok(IngestOutcome {
            documents: documents.len(),
            chunks_indexed,
            duplicate_chunks,
            skipped_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LengthFunction;
    use crate::embedding::EmbeddingClientError;
    use crate::ingestion::docx::docx_with_body;
    use crate::ingestion::partition::{jpeg_xobject, pdf_with_pages};
    use crate::llm::{ChatModel, ChatRequest, ChatResponse, Part};
    use crate::pinecone::IndexSpec;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };
    use serde_json::json;

    struct CannedModel;

    #[async_trait]
    impl ChatModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _request: ChatRequest) -> Result<ChatResponse, LlmError> {
            Ok(ChatResponse {
                text: "summary".into(),
                tool_calls: Vec::new(),
            })
        }
    }

    struct FixedEmbeddings;

    #[async_trait]
    impl EmbeddingClient for FixedEmbeddings {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    /// Echoes the prompt so every element gets a distinct summary.
    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
            let prompt = request
                .messages
                .iter()
                .flat_map(|message| &message.parts)
                .find_map(|part| match part {
                    Part::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            Ok(ChatResponse {
                text: format!("summary of {prompt}"),
                tool_calls: Vec::new(),
            })
        }
    }

    fn service(control_url: &str) -> IngestionService {
        service_with_model(control_url, Arc::new(CannedModel))
    }

    fn service_with_model(control_url: &str, model: Arc<dyn ChatModel>) -> IngestionService {
        let index = PineconeService::from_parts(
            control_url,
            "pc-key",
            IndexSpec {
                name: "physics-bot".into(),
                dimension: 3,
                metric: "cosine".into(),
                cloud: "aws".into(),
                region: "us-east-1".into(),
            },
            "",
        )
        .expect("pinecone client");
        IngestionService::new(
            Summarizer::new(model.clone(), model, 2),
            Arc::new(FixedEmbeddings),
            Arc::new(index),
            SplitterConfig {
                chunk_size: 1000,
                chunk_overlap: 200,
                length_function: LengthFunction::Characters,
            },
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn unsupported_only_upload_touches_nothing() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(500);
            })
            .await;

        let outcome = service(&server.base_url())
            .run_pipeline(vec![UploadedFile::new("notes.txt", b"hello".to_vec())])
            .await
            .expect("outcome");

        any.assert_hits(0);
        assert_eq!(outcome.documents, 0);
        assert_eq!(outcome.chunks_indexed, 0);
        assert_eq!(outcome.skipped_files, vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn docx_upload_is_indexed() {
        let server = MockServer::start_async().await;
        let base = server.base_url();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200).json_body(json!({ "indexes": [] }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes");
                then.status(201).json_body(json!({ "name": "physics-bot" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes/physics-bot");
                then.status(200).json_body(json!({
                    "name": "physics-bot",
                    "dimension": 3,
                    "host": base,
                    "status": { "ready": true, "state": "Ready" }
                }));
            })
            .await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vectors/upsert")
                    .body_contains("\"type\":\"docx\"")
                    .body_contains("\"source\":\"ohm.docx\"");
                then.status(200).json_body(json!({ "upsertedCount": 1 }));
            })
            .await;

        let bytes = docx_with_body("<w:p><w:r><w:t>Ohm's law relates voltage and current.</w:t></w:r></w:p>");
        let outcome = service(&server.base_url())
            .run_pipeline(vec![
                UploadedFile::new("ohm.docx", bytes),
                UploadedFile::new("slides.pptx", vec![1, 2, 3]),
            ])
            .await
            .expect("outcome");

        create.assert();
        upsert.assert();
        assert_eq!(
            outcome,
            IngestOutcome {
                documents: 1,
                chunks_indexed: 1,
                duplicate_chunks: 0,
                skipped_files: vec!["slides.pptx".into()],
            }
        );
    }

    #[tokio::test]
    async fn pdf_upload_indexes_each_bucket_kind() {
        let server = MockServer::start_async().await;
        let base = server.base_url();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes");
                then.status(200)
                    .json_body(json!({ "indexes": [{ "name": "physics-bot" }] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/indexes/physics-bot");
                then.status(200).json_body(json!({
                    "name": "physics-bot",
                    "dimension": 3,
                    "host": base,
                    "status": { "ready": true, "state": "Ready" }
                }));
            })
            .await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vectors/upsert")
                    .body_contains("\"type\":\"table_summary\"")
                    .body_contains("\"type\":\"header_summary\"")
                    .body_contains("\"type\":\"footer_summary\"")
                    .body_contains("\"type\":\"title_summary\"")
                    .body_contains("\"type\":\"list_item_summary\"")
                    .body_contains("\"type\":\"narrative_text_summary\"")
                    .body_contains("\"type\":\"image_summary\"")
                    .body_contains("\"source\":\"force.pdf\"");
                then.status(200).json_body(json!({ "upsertedCount": 1 }));
            })
            .await;

        let pages: [&[&str]; 2] = [
            &[
                "Physics for Class 10",
                "Chapter 1 Force",
                "- Force is a push or pull",
                "Quantity|Unit|Symbol",
                "Force|newton|N",
                "A force acts on a body and changes its motion.",
                "1",
            ],
            &[
                "Physics for Class 10",
                "Newton described three laws of motion in detail.",
                "2",
            ],
        ];
        let image = jpeg_xobject(vec![0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9]);
        let bytes = pdf_with_pages(&pages, Some(image));

        let outcome = service_with_model(&server.base_url(), Arc::new(EchoModel))
            .run_pipeline(vec![UploadedFile::new("force.pdf", bytes)])
            .await
            .expect("outcome");

        upsert.assert_async().await;
        assert!(outcome.documents >= 7, "documents: {}", outcome.documents);
        assert!(outcome.chunks_indexed >= 7);
        assert!(outcome.skipped_files.is_empty());
    }

    #[tokio::test]
    async fn corrupt_pdf_aborts_the_upload() {
        let server = MockServer::start_async().await;
        let error = service(&server.base_url())
            .run_pipeline(vec![UploadedFile::new("broken.pdf", b"%PDF-garbage".to_vec())])
            .await
            .expect_err("partition failure");
        assert!(matches!(error, IngestionError::Partition { file, .. } if file == "broken.pdf"));
    }

    #[test]
    fn records_carry_chunk_metadata() {
        let chunks = vec![PreparedChunk {
            text: "Work = force x distance".into(),
            kind: DocumentKind::NarrativeTextSummary,
            source: "work.pdf".into(),
            chunk_hash: "abc".into(),
        }];
        let records = build_records(chunks, vec![vec![1.0, 0.0, 0.0]]);
        assert_eq!(records.len(), 1);
        let metadata = &records[0].metadata;
        assert_eq!(metadata["text"], "Work = force x distance");
        assert_eq!(metadata["type"], "narrative_text_summary");
        assert_eq!(metadata["source"], "work.pdf");
        assert!(metadata.contains_key("timestamp"));
        assert_eq!(records[0].values, vec![1.0, 0.0, 0.0]);
    }
}

//! Per-bucket summarization of partitioned elements.

use super::elements::ElementBuckets;
use super::types::{Document, DocumentKind, IngestionError};
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::prompts::{self, fill};
use futures_util::{StreamExt, TryStreamExt, stream};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Spaces out text buckets to stay under provider rate limits.
///
/// The pause is only taken once a model call has already happened during the upload, so an
/// upload whose first non-empty bucket is a text bucket starts immediately.
#[derive(Debug)]
pub struct BucketPacer {
    delay: Duration,
    primed: bool,
}

impl BucketPacer {
    /// Pacer inserting `delay` between buckets.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            primed: false,
        }
    }

    async fn before_bucket(&mut self, bucket: &str) {
        if self.primed && !self.delay.is_zero() {
            tracing::debug!(bucket, delay_secs = self.delay.as_secs(), "Pausing before bucket");
            tokio::time::sleep(self.delay).await;
        }
    }

    fn mark_called(&mut self) {
        self.primed = true;
    }
}

/// Summarizes element buckets with a chat model and a vision model.
pub struct Summarizer {
    chat_model: Arc<dyn ChatModel>,
    vision_model: Arc<dyn ChatModel>,
    concurrency: usize,
}

impl Summarizer {
    /// Build a summarizer running at most `concurrency` calls per bucket at once.
    pub fn new(
        chat_model: Arc<dyn ChatModel>,
        vision_model: Arc<dyn ChatModel>,
        concurrency: usize,
    ) -> Self {
        Self {
            chat_model,
            vision_model,
            concurrency: concurrency.max(1),
        }
    }

    /// Summarize table HTML, preserving input order.
    pub async fn summarize_tables(&self, tables: &[String]) -> Result<Vec<String>, IngestionError> {
        self.summarize_with(tables, "tables", |table| {
            fill(prompts::TABLE_SUMMARY, &[("element", table)])
        })
        .await
    }

    /// Summarize text elements of one bucket, preserving input order.
    pub async fn summarize_texts(
        &self,
        texts: &[String],
        bucket: &'static str,
    ) -> Result<Vec<String>, IngestionError> {
        self.summarize_with(texts, bucket, |text| {
            fill(prompts::TEXT_SUMMARY, &[("text", text)])
        })
        .await
    }

    /// Summarize base64 JPEG images one at a time with the vision model.
    pub async fn summarize_images(&self, images: &[String]) -> Result<Vec<String>, IngestionError> {
        let mut summaries = Vec::with_capacity(images.len());
        for image in images {
            let request = ChatRequest {
                messages: vec![ChatMessage::user_with_image(
                    prompts::IMAGE_SUMMARY,
                    "image/jpeg",
                    image.as_str(),
                )],
                ..ChatRequest::default()
            };
            let response = self
                .vision_model
                .generate(request)
                .await
                .map_err(|source| IngestionError::Summarization {
                    bucket: "images",
                    source,
                })?;
            summaries.push(response.text.trim().to_string());
        }
        Ok(summaries)
    }

    /// Summarize every bucket of one file into documents tagged with `source`.
    ///
    /// Buckets run in a fixed order: tables, headers, footers, titles, narrative text, generic
    /// text, list items, images.
    pub async fn summarize_buckets(
        &self,
        buckets: &ElementBuckets,
        source: &str,
        pacer: &mut BucketPacer,
    ) -> Result<Vec<Document>, IngestionError> {
        let mut documents = Vec::new();

        if !buckets.tables.is_empty() {
            let summaries = self.summarize_tables(&buckets.tables).await?;
            pacer.mark_called();
            push_documents(&mut documents, summaries, DocumentKind::TableSummary, source);
        }

        let text_buckets: [(&[String], DocumentKind, &'static str); 6] = [
            (buckets.headers.as_slice(), DocumentKind::HeaderSummary, "headers"),
            (buckets.footers.as_slice(), DocumentKind::FooterSummary, "footers"),
            (buckets.titles.as_slice(), DocumentKind::TitleSummary, "titles"),
            (
                buckets.narrative_texts.as_slice(),
                DocumentKind::NarrativeTextSummary,
                "narrative_texts",
            ),
            (buckets.texts.as_slice(), DocumentKind::TextSummary, "texts"),
            (buckets.list_items.as_slice(), DocumentKind::ListItemSummary, "list_items"),
        ];
        for (texts, kind, bucket) in text_buckets {
            if texts.is_empty() {
                continue;
            }
            pacer.before_bucket(bucket).await;
            let summaries = self.summarize_texts(texts, bucket).await?;
            pacer.mark_called();
            push_documents(&mut documents, summaries, kind, source);
        }

        if !buckets.images.is_empty() {
            let summaries = self.summarize_images(&buckets.images).await?;
            pacer.mark_called();
            push_documents(&mut documents, summaries, DocumentKind::ImageSummary, source);
        }

        Ok(documents)
    }

    async fn summarize_with<F>(
        &self,
        items: &[String],
        bucket: &'static str,
        render: F,
    ) -> Result<Vec<String>, IngestionError>
    where
        F: Fn(&str) -> Result<String, prompts::PromptError>,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let rendered = items
            .iter()
            .map(|item| render(item))
            .collect::<Result<Vec<_>, _>>()?;

        let summaries: Vec<String> = stream::iter(rendered)
            .map(|prompt| {
                let model = Arc::clone(&self.chat_model);
                async move { model.complete(prompt).await }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
            .map_err(|source| IngestionError::Summarization { bucket, source })?;

        tracing::info!(
            bucket,
            items = summaries.len(),
            model = self.chat_model.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bucket summarized"
        );
        Ok(summaries)
    }
}

fn push_documents(
    documents: &mut Vec<Document>,
    summaries: Vec<String>,
    kind: DocumentKind,
    source: &str,
) {
    documents.extend(
        summaries
            .into_iter()
            .filter(|summary| !summary.trim().is_empty())
            .map(|summary| Document::new(summary, kind, source)),
    );
}

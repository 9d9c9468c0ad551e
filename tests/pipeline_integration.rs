use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use physicsbot::agent::QueryService;
use physicsbot::api::{AppState, create_router};
use physicsbot::config::{Config, Settings};
use physicsbot::embedding::GoogleEmbeddingClient;
use physicsbot::ingestion::IngestionService;
use physicsbot::metrics::ServiceMetrics;
use physicsbot::pinecone::PineconeService;
use serde_json::{Value, json};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

fn test_config(base_url: &str) -> Config {
    let mut settings = Settings::default();
    settings.vector_db.dimension = 3;
    settings.ingestion.bucket_delay_secs = 0;
    let base = base_url.to_string();
    Config::from_lookup(
        move |key| match key {
            "GOOGLE_API_KEY" => Some("google-key".into()),
            "PINECONE_API_KEY" => Some("pinecone-key".into()),
            "GOOGLE_API_BASE_URL" | "PINECONE_CONTROL_URL" => Some(base.clone()),
            _ => None,
        },
        settings,
    )
    .expect("config")
}

fn build_app(config: &Config) -> Router {
    let embedding_client = Arc::new(GoogleEmbeddingClient::from_config(config).expect("embedder"));
    let index = Arc::new(PineconeService::new(config).expect("pinecone"));
    let ingestion = IngestionService::from_config(config, embedding_client.clone(), index.clone())
        .expect("ingestion service");
    let query = QueryService::from_config(config, embedding_client, index).expect("query service");
    create_router(AppState {
        ingestion: Arc::new(ingestion),
        query: Arc::new(query),
        metrics: Arc::new(ServiceMetrics::new()),
    })
}

fn docx(paragraph: &str) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .expect("start file");
        write!(
            writer,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p></w:body></w:document>"#
        )
        .expect("write xml");
        writer.finish().expect("finish");
    }
    buffer.into_inner()
}

fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "integration-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn docx_upload_creates_index_and_upserts_vectors() {
    let server = MockServer::start_async().await;
    let base = server.base_url();

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/indexes")
                .header("Api-Key", "pinecone-key");
            then.status(200).json_body(json!({ "indexes": [] }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/indexes")
                .json_body_partial(r#"{ "name": "physics-bot", "dimension": 3, "metric": "cosine" }"#);
            then.status(201).json_body(json!({ "name": "physics-bot" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/indexes/physics-bot");
            then.status(200).json_body(json!({
                "name": "physics-bot",
                "dimension": 3,
                "metric": "cosine",
                "host": base,
                "status": { "ready": true, "state": "Ready" }
            }));
        })
        .await;
    let embed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/text-embedding-004:batchEmbedContents")
                .header("x-goog-api-key", "google-key")
                .body_contains("RETRIEVAL_DOCUMENT");
            then.status(200)
                .json_body(json!({ "embeddings": [{ "values": [0.1, 0.2, 0.3] }] }));
        })
        .await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/vectors/upsert")
                .body_contains("Archimedes")
                .body_contains("\"source\":\"buoyancy.docx\"");
            then.status(200).json_body(json!({ "upsertedCount": 1 }));
        })
        .await;

    let app = build_app(&test_config(&server.base_url()));
    let response = app
        .clone()
        .oneshot(upload_request(
            "buoyancy.docx",
            &docx("Archimedes' principle explains buoyancy."),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["files_received"], 1);
    assert_eq!(body["documents"], 1);
    assert_eq!(body["chunks_indexed"], 1);
    create.assert_async().await;
    embed.assert_async().await;
    upsert.assert_async().await;

    let metrics = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let snapshot = read_json(metrics).await;
    assert_eq!(snapshot["uploads_processed"], 1);
    assert_eq!(snapshot["chunks_indexed"], 1);
}

#[tokio::test]
async fn query_without_tool_call_returns_model_text() {
    let server = MockServer::start_async().await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/gemini-1.5-flash:generateContent")
                .body_contains("functionDeclarations")
                .body_contains("answer_query_tool");
            then.status(200).json_body(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello! Ask me about physics." }] }
                }]
            }));
        })
        .await;

    let app = build_app(&test_config(&server.base_url()));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "question": "hi" }).to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await["answer"],
        "Hello! Ask me about physics."
    );
    chat.assert_async().await;
}

#[test]
fn missing_keys_are_reported_together() {
    let error = Config::from_lookup(|_| None, Settings::default()).expect_err("missing keys");
    let message = error.to_string();
    assert!(message.contains("GOOGLE_API_KEY"));
    assert!(message.contains("PINECONE_API_KEY"));
}

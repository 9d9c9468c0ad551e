//! Helpers for constructing vector metadata and identifiers.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the metadata object stored alongside each indexed chunk.
pub fn build_metadata(
    text: &str,
    kind: &str,
    source: &str,
    chunk_hash: &str,
    timestamp_rfc3339: &str,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("text".into(), Value::String(text.to_string()));
    metadata.insert("type".into(), Value::String(kind.to_string()));
    if !source.is_empty() {
        metadata.insert("source".into(), Value::String(source.to_string()));
    }
    metadata.insert("chunk_hash".into(), Value::String(chunk_hash.to_string()));
    metadata.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    metadata
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Random identifier for a new vector record.
pub fn generate_vector_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current timestamp formatted for metadata storage.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Map a raw Pinecone score onto a `[0, 1]` relevance score for `metric`.
///
/// Cosine similarity lies in `[-1, 1]` and is shifted with `(s + 1) / 2`. Other metrics are
/// clamped as-is.
pub fn relevance_score(metric: &str, score: f32) -> f32 {
    match metric {
        "cosine" => (score + 1.0) / 2.0,
        _ => score.clamp(0.0, 1.0),
    }
}

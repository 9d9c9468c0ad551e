//! Gemini `generateContent` adapter.

use super::{ChatModel, ChatRequest, ChatResponse, LlmError, Part, Role, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Chat model backed by the Google Generative Language API.
pub struct GeminiChatModel {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiChatModel {
    /// Create an adapter for `model` (with or without the `models/` prefix).
    pub fn new(http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.trim_start_matches("models/").to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Translate a request into the `generateContent` body.
///
/// Consecutive messages that map to the same Gemini role are merged into one turn, which is how
/// Gemini expects several function responses answering one model turn.
pub(crate) fn build_body(request: &ChatRequest) -> Value {
    let mut contents: Vec<(&'static str, Vec<Value>)> = Vec::new();
    for message in &request.messages {
        let role = match message.role {
            Role::Assistant => "model",
            Role::User | Role::Tool => "user",
        };
        let parts: Vec<Value> = message.parts.iter().map(part_to_json).collect();
        match contents.last_mut() {
            Some((last_role, last_parts)) if *last_role == role => last_parts.extend(parts),
            _ => contents.push((role, parts)),
        }
    }

    let mut body = Map::new();
    body.insert(
        "contents".into(),
        Value::Array(
            contents
                .into_iter()
                .map(|(role, parts)| json!({ "role": role, "parts": parts }))
                .collect(),
        ),
    );

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect();
        body.insert(
            "tools".into(),
            json!([{ "functionDeclarations": declarations }]),
        );
    }

    if let Some(temperature) = request.temperature {
        body.insert(
            "generationConfig".into(),
            json!({ "temperature": temperature }),
        );
    }

    Value::Object(body)
}

fn part_to_json(part: &Part) -> Value {
    match part {
        Part::Text(text) => json!({ "text": text }),
        Part::InlineImage { mime_type, data } => json!({
            "inlineData": { "mimeType": mime_type, "data": data }
        }),
        Part::FunctionCall(call) => json!({
            "functionCall": { "name": call.name, "args": call.args }
        }),
        Part::FunctionResponse { name, content, .. } => json!({
            "functionResponse": { "name": name, "response": { "content": content } }
        }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

fn parse_response(body: GenerateContentResponse) -> Result<ChatResponse, LlmError> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(LlmError::InvalidResponse(format!(
            "no candidates returned (prompt feedback: {})",
            body.prompt_feedback.unwrap_or(Value::Null)
        )));
    };

    let mut response = ChatResponse::default();
    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    if parts.is_empty() {
        tracing::warn!(
            finish_reason = ?candidate.finish_reason,
            "Gemini candidate carried no content"
        );
    }

    for part in parts {
        if let Some(text) = part.text {
            response.text.push_str(&text);
        }
        if let Some(call) = part.function_call {
            response.tool_calls.push(ToolCall {
                id: call.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                name: call.name,
                args: if call.args.is_null() {
                    json!({})
                } else {
                    call.args
                },
            });
        }
    }
    Ok(response)
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = build_body(&request);
        tracing::debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling Gemini"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!("failed to reach Gemini: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;
        parse_response(body)
    }
}

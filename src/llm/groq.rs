//! Groq adapter over the OpenAI-compatible `chat/completions` endpoint.

use super::{ChatModel, ChatRequest, ChatResponse, LlmError, Part, Role, ToolCall};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Chat model served by Groq.
pub struct GroqChatModel {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqChatModel {
    /// Create an adapter targeting `model`.
    pub fn new(http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Translate a request into OpenAI-style chat messages.
pub(crate) fn build_body(model: &str, request: &ChatRequest) -> Result<Value, LlmError> {
    let mut messages = Vec::new();
    for message in &request.messages {
        match message.role {
            Role::User => {
                if message
                    .parts
                    .iter()
                    .any(|part| matches!(part, Part::InlineImage { .. }))
                {
                    return Err(LlmError::Unsupported(
                        "inline images are not supported by the Groq adapter".into(),
                    ));
                }
                messages.push(json!({ "role": "user", "content": message.text() }));
            }
            Role::Assistant => {
                let tool_calls: Vec<Value> = message
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        Part::FunctionCall(call) => Some(json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.args.to_string(),
                            }
                        })),
                        _ => None,
                    })
                    .collect();
                let mut entry = Map::new();
                entry.insert("role".into(), json!("assistant"));
                entry.insert("content".into(), json!(message.text()));
                if !tool_calls.is_empty() {
                    entry.insert("tool_calls".into(), Value::Array(tool_calls));
                }
                messages.push(Value::Object(entry));
            }
            Role::Tool => {
                for part in &message.parts {
                    if let Part::FunctionResponse {
                        call_id, content, ..
                    } = part
                    {
                        messages.push(json!({
                            "role": "tool",
                            "tool_call_id": call_id,
                            "content": content,
                        }));
                    }
                }
            }
        }
    }

    let mut body = Map::new();
    body.insert("model".into(), json!(model));
    body.insert("messages".into(), Value::Array(messages));
    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();
        body.insert("tools".into(), Value::Array(tools));
    }
    if let Some(temperature) = request.temperature {
        body.insert("temperature".into(), json!(temperature));
    }
    Ok(Value::Object(body))
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<CompletionToolCall>>,
}

#[derive(Debug, Deserialize)]
struct CompletionToolCall {
    id: String,
    function: CompletionFunction,
}

#[derive(Debug, Deserialize)]
struct CompletionFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[async_trait]
impl ChatModel for GroqChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let body = build_body(&self.model, &request)?;
        tracing::debug!(model = %self.model, messages = request.messages.len(), "Calling Groq");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                LlmError::ProviderUnavailable(format!("failed to reach Groq: {error}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::GenerationFailed(format!(
                "Groq returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            LlmError::InvalidResponse(format!("failed to decode Groq response: {error}"))
        })?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices returned".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                // Unparseable arguments are passed through so the tool node can report them.
                args: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments)),
            })
            .collect();

        Ok(ChatResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use httpmock::{Method::POST, MockServer};

    fn model(base_url: &str) -> GroqChatModel {
        GroqChatModel::new(
            Client::builder()
                .user_agent("physicsbot-test")
                .build()
                .expect("client"),
            base_url,
            "groq-key",
            "llama-3.1-8b-instant",
        )
    }

    #[test]
    fn tool_messages_become_individual_entries() {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::user_text("q"),
                ChatMessage {
                    role: Role::Assistant,
                    parts: vec![Part::FunctionCall(ToolCall {
                        id: "call_1".into(),
                        name: "answer_query_tool".into(),
                        args: json!({ "question": "q" }),
                    })],
                },
                ChatMessage {
                    role: Role::Tool,
                    parts: vec![Part::FunctionResponse {
                        call_id: "call_1".into(),
                        name: "answer_query_tool".into(),
                        content: "answer".into(),
                    }],
                },
            ],
            ..ChatRequest::default()
        };

        let body = build_body("m", &request).expect("body");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[1]["tool_calls"][0]["function"]["arguments"],
            "{\"question\":\"q\"}"
        );
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
    }

    #[test]
    fn images_are_rejected() {
        let request = ChatRequest {
            messages: vec![ChatMessage::user_with_image("p", "image/jpeg", "AAAA")],
            ..ChatRequest::default()
        };
        assert!(matches!(
            build_body("m", &request),
            Err(LlmError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn completion_returns_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer groq-key");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": " A table of speeds. " }
                    }]
                }));
            })
            .await;

        let text = model(&server.base_url())
            .complete("summarize".into())
            .await
            .expect("completion");

        mock.assert();
        assert_eq!(text, "A table of speeds.");
    }

    #[tokio::test]
    async fn tool_call_arguments_are_decoded() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_9",
                                "type": "function",
                                "function": {
                                    "name": "summarize_chapter_tool",
                                    "arguments": "{\"question\":\"Chapter 3\"}"
                                }
                            }]
                        }
                    }]
                }));
            })
            .await;

        let response = model(&server.base_url())
            .generate(ChatRequest::from_prompt("summarize chapter 3"))
            .await
            .expect("response");

        assert!(response.text.is_empty());
        assert_eq!(response.tool_calls[0].id, "call_9");
        assert_eq!(response.tool_calls[0].args, json!({ "question": "Chapter 3" }));
    }

    #[tokio::test]
    async fn null_tool_calls_mean_a_plain_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": "Inertia resists changes in motion.",
                            "tool_calls": null
                        }
                    }]
                }));
            })
            .await;

        let response = model(&server.base_url())
            .generate(ChatRequest::from_prompt("what is inertia?"))
            .await
            .expect("response");

        assert_eq!(response.text, "Inertia resists changes in motion.");
        assert!(response.tool_calls.is_empty());
    }
}

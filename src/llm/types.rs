//! Provider-neutral chat request and response types.

use serde_json::Value;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// End user or caller-supplied prompt.
    User,
    /// Model output, possibly carrying tool calls.
    Assistant,
    /// Results of tool invocations requested by the assistant.
    Tool,
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Identifier pairing the call with its response.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// JSON arguments supplied by the model.
    pub args: Value,
}

/// One piece of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// Base64-encoded image sent inline with the prompt.
    InlineImage {
        /// MIME type such as `image/jpeg`.
        mime_type: String,
        /// Base64 payload.
        data: String,
    },
    /// Tool call emitted by the assistant.
    FunctionCall(ToolCall),
    /// Output of a tool call.
    FunctionResponse {
        /// Identifier of the originating call.
        call_id: String,
        /// Tool name.
        name: String,
        /// Tool output rendered as text.
        content: String,
    },
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Who produced the message.
    pub role: Role,
    /// Ordered content parts.
    pub parts: Vec<Part>,
}

impl ChatMessage {
    /// User message holding a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// User message pairing a text prompt with an inline image.
    pub fn user_with_image(
        prompt: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                Part::Text(prompt.into()),
                Part::InlineImage {
                    mime_type: mime_type.into(),
                    data: data.into(),
                },
            ],
        }
    }

    /// Concatenate every text part.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Function declaration advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    /// Tool name the model uses to call it.
    pub name: String,
    /// Human-readable description guiding tool selection.
    pub description: String,
    /// JSON schema (OpenAPI subset) of the arguments object.
    pub parameters: Value,
}

/// Request sent to a [`crate::llm::ChatModel`].
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call.
    pub tools: Vec<ToolDeclaration>,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Single-turn request with one user prompt and no tools.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user_text(prompt)],
            ..Self::default()
        }
    }
}

/// Model output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    /// Concatenated text content (may be empty when only tools were called).
    pub text: String,
    /// Tool calls requested by the model, in emission order.
    pub tool_calls: Vec<ToolCall>,
}

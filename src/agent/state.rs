use crate::llm::{ChatMessage, Part, Role, ToolCall};

/// Conversation entry tracked by the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Question from the user.
    Human(String),
    /// Model turn; may request tool calls.
    Ai {
        /// Text content of the turn.
        content: String,
        /// Calls to run before the next model turn.
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one tool call.
    Tool {
        /// Identifier of the call this answers.
        call_id: String,
        /// Tool that was invoked.
        name: String,
        /// Tool output, or an error description the model can react to.
        content: String,
        /// Whether `content` describes a failure.
        is_error: bool,
    },
}

impl Message {
    fn to_chat_message(&self) -> ChatMessage {
        match self {
            Message::Human(text) => ChatMessage::user_text(text.clone()),
            Message::Ai {
                content,
                tool_calls,
            } => {
                let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                if !content.is_empty() {
                    parts.push(Part::Text(content.clone()));
                }
                parts.extend(tool_calls.iter().cloned().map(Part::FunctionCall));
                ChatMessage {
                    role: Role::Assistant,
                    parts,
                }
            }
            Message::Tool {
                call_id,
                name,
                content,
                ..
            } => ChatMessage {
                role: Role::Tool,
                parts: vec![Part::FunctionResponse {
                    call_id: call_id.clone(),
                    name: name.clone(),
                    content: content.clone(),
                }],
            },
        }
    }
}

/// Append-only message list threaded through the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    /// Messages in arrival order.
    pub messages: Vec<Message>,
}

impl GraphState {
    /// Start a conversation from a single user question.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::Human(question.into())],
        }
    }

    /// Merge node output into the state by appending.
    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Tool calls requested by the most recent message, if it is a model turn.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        match self.messages.last() {
            Some(Message::Ai { tool_calls, .. }) => tool_calls,
            _ => &[],
        }
    }

    /// Content of the last model turn.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|message| match message {
            Message::Ai { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Render the conversation for a chat model request.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat_message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "answer_query_tool".into(),
            args: json!({ "question": "What is inertia?" }),
        }
    }

    #[test]
    fn pending_calls_come_from_last_ai_turn_only() {
        let mut state = GraphState::from_question("What is inertia?");
        assert!(state.pending_tool_calls().is_empty());

        state.add_messages([Message::Ai {
            content: String::new(),
            tool_calls: vec![call("c1")],
        }]);
        assert_eq!(state.pending_tool_calls().len(), 1);

        state.add_messages([Message::Tool {
            call_id: "c1".into(),
            name: "answer_query_tool".into(),
            content: "Inertia resists changes in motion.".into(),
            is_error: false,
        }]);
        assert!(state.pending_tool_calls().is_empty());
    }

    #[test]
    fn final_answer_skips_tool_messages() {
        let mut state = GraphState::from_question("q");
        assert_eq!(state.final_answer(), None);
        state.add_messages([
            Message::Ai {
                content: "first".into(),
                tool_calls: vec![call("c1")],
            },
            Message::Tool {
                call_id: "c1".into(),
                name: "answer_query_tool".into(),
                content: "tool output".into(),
                is_error: false,
            },
            Message::Ai {
                content: "final".into(),
                tool_calls: Vec::new(),
            },
        ]);
        assert_eq!(state.final_answer(), Some("final"));
    }

    #[test]
    fn chat_messages_map_roles_and_parts() {
        let mut state = GraphState::from_question("q");
        state.add_messages([
            Message::Ai {
                content: String::new(),
                tool_calls: vec![call("c1")],
            },
            Message::Tool {
                call_id: "c1".into(),
                name: "answer_query_tool".into(),
                content: "out".into(),
                is_error: false,
            },
        ]);
        let rendered = state.to_chat_messages();
        assert_eq!(rendered[0], ChatMessage::user_text("q"));
        assert_eq!(rendered[1].role, Role::Assistant);
        assert_eq!(rendered[1].parts, vec![Part::FunctionCall(call("c1"))]);
        assert_eq!(rendered[2].role, Role::Tool);
        assert!(matches!(
            &rendered[2].parts[0],
            Part::FunctionResponse { call_id, content, .. } if call_id == "c1" && content == "out"
        ));
    }
}

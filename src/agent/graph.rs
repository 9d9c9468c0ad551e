use super::AgentError;
use super::state::{GraphState, Message};
use super::tools::Toolbox;
use crate::llm::{ChatModel, ChatRequest};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Chatbot,
    Tools,
    End,
}

/// `START -> chatbot`, `chatbot -> tools | END`, `tools -> chatbot`.
pub struct StudyGraph {
    llm: Arc<dyn ChatModel>,
    toolbox: Toolbox,
    max_steps: usize,
}

impl StudyGraph {
    /// Build a graph whose chatbot node calls `llm` with every tool in `toolbox` bound.
    pub fn new(llm: Arc<dyn ChatModel>, toolbox: Toolbox, max_steps: usize) -> Self {
        Self {
            llm,
            toolbox,
            max_steps,
        }
    }

    /// Run to completion, returning the final state.
    ///
    /// Each node execution counts as one step; exceeding `max_steps` aborts with
    /// [`AgentError::StepLimit`].
    pub async fn run(&self, mut state: GraphState) -> Result<GraphState, AgentError> {
        let mut node = Node::Chatbot;
        let mut steps = 0;

        while node != Node::End {
            if steps >= self.max_steps {
                tracing::warn!(steps, "Conversation graph hit its step limit");
                return Err(AgentError::StepLimit(self.max_steps));
            }
            steps += 1;

            node = match node {
                Node::Chatbot => self.chatbot(&mut state).await?,
                Node::Tools => self.tools(&mut state).await,
                Node::End => Node::End,
            };
        }

        tracing::debug!(steps, messages = state.messages.len(), "Conversation graph finished");
        Ok(state)
    }

    async fn chatbot(&self, state: &mut GraphState) -> Result<Node, AgentError> {
        let request = ChatRequest {
            messages: state.to_chat_messages(),
            tools: self.toolbox.declarations(),
            temperature: None,
        };
        let response = self.llm.generate(request).await?;
        state.add_messages([Message::Ai {
            content: response.text,
            tool_calls: response.tool_calls,
        }]);

        if state.pending_tool_calls().is_empty() {
            Ok(Node::End)
        } else {
            Ok(Node::Tools)
        }
    }

    async fn tools(&self, state: &mut GraphState) -> Node {
        let calls = state.pending_tool_calls().to_vec();
        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            results.push(self.toolbox.invoke(call).await);
        }
        state.add_messages(results);
        Node::Chatbot
    }
}

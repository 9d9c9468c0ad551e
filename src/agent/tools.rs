//! Study tools the conversation model can call.

use super::retriever::ContextRetriever;
use super::state::Message;
use super::AgentError;
use crate::llm::{ChatModel, ToolCall, ToolDeclaration};
use crate::prompts::{self, fill};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Arguments shared by every study tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RagToolSchema {
    /// The student's question, or the chapter or topic to work on.
    pub question: String,
}

/// JSON schema for [`RagToolSchema`], reduced to the subset function-calling APIs accept.
pub(crate) fn rag_tool_parameters() -> Value {
    let schema = schemars::schema_for!(RagToolSchema);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.remove("definitions");
    }
    value
}

/// A callable tool exposed to the conversation model.
#[async_trait]
pub trait StudyTool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &'static str;

    /// Description guiding the model's tool choice.
    fn description(&self) -> &'static str;

    /// Run the tool.
    async fn call(&self, args: RagToolSchema) -> Result<String, AgentError>;

    /// Declaration advertised to the model.
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: rag_tool_parameters(),
        }
    }
}

/// Answers a question from retrieved textbook passages.
pub struct AnswerQueryTool {
    retriever: Arc<dyn ContextRetriever>,
    llm: Arc<dyn ChatModel>,
}

impl AnswerQueryTool {
    /// Create the tool.
    pub fn new(retriever: Arc<dyn ContextRetriever>, llm: Arc<dyn ChatModel>) -> Self {
        Self { retriever, llm }
    }
}

#[async_trait]
impl StudyTool for AnswerQueryTool {
    fn name(&self) -> &'static str {
        "answer_query_tool"
    }

    fn description(&self) -> &'static str {
        "Answer user question using textbook content."
    }

    async fn call(&self, args: RagToolSchema) -> Result<String, AgentError> {
        let context = self.retriever.context(&args.question).await?;
        let prompt = fill(
            prompts::ANSWER_QUERY,
            &[("context", &context), ("question", &args.question)],
        )?;
        Ok(self.llm.complete(prompt).await?)
    }
}

/// Writes exam-style questions for a topic without consulting the index.
pub struct GenerateImportantQuestionsTool {
    llm: Arc<dyn ChatModel>,
}

impl GenerateImportantQuestionsTool {
    /// Create the tool.
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StudyTool for GenerateImportantQuestionsTool {
    fn name(&self) -> &'static str {
        "generate_important_questions_tool"
    }

    fn description(&self) -> &'static str {
        "Generate exam-style questions from a topic."
    }

    async fn call(&self, args: RagToolSchema) -> Result<String, AgentError> {
        let prompt = fill(
            prompts::GENERATE_IMPORTANT_QUESTIONS,
            &[("chapter_or_topic", &args.question)],
        )?;
        Ok(self.llm.complete(prompt).await?)
    }
}

/// Summarizes the retrieved passages of a chapter.
pub struct SummarizeChapterTool {
    retriever: Arc<dyn ContextRetriever>,
    llm: Arc<dyn ChatModel>,
}

impl SummarizeChapterTool {
    /// Create the tool.
    pub fn new(retriever: Arc<dyn ContextRetriever>, llm: Arc<dyn ChatModel>) -> Self {
        Self { retriever, llm }
    }
}

#[async_trait]
impl StudyTool for SummarizeChapterTool {
    fn name(&self) -> &'static str {
        "summarize_chapter_tool"
    }

    fn description(&self) -> &'static str {
        "Summarize a physics chapter into key points and formulas."
    }

    async fn call(&self, args: RagToolSchema) -> Result<String, AgentError> {
        let chapter_text = self.retriever.context(&args.question).await?;
        let prompt = fill(prompts::SUMMARIZE_CHAPTER, &[("chapter_text", &chapter_text)])?;
        Ok(self.llm.complete(prompt).await?)
    }
}

/// Registry dispatching model tool calls by name.
#[derive(Clone)]
pub struct Toolbox {
    tools: Vec<Arc<dyn StudyTool>>,
}

impl Toolbox {
    /// Wrap an explicit tool list.
    pub fn new(tools: Vec<Arc<dyn StudyTool>>) -> Self {
        Self { tools }
    }

    /// The three study tools sharing one retriever and model.
    pub fn study_tools(retriever: Arc<dyn ContextRetriever>, llm: Arc<dyn ChatModel>) -> Self {
        Self::new(vec![
            Arc::new(AnswerQueryTool::new(retriever.clone(), llm.clone())),
            Arc::new(GenerateImportantQuestionsTool::new(llm.clone())),
            Arc::new(SummarizeChapterTool::new(retriever, llm)),
        ])
    }

    /// Declarations for every registered tool, in registration order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|tool| tool.declaration()).collect()
    }

    fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    /// Run one call and wrap its outcome as a tool message.
    ///
    /// Failures become error messages rather than `Err` so the model can retry or explain.
    pub async fn invoke(&self, call: &ToolCall) -> Message {
        let result = match self.tools.iter().find(|tool| tool.name() == call.name) {
            None => Err(format!(
                "Error: {} is not a valid tool, try one of [{}].",
                call.name,
                self.names().join(", ")
            )),
            Some(tool) => match serde_json::from_value::<RagToolSchema>(call.args.clone()) {
                Err(error) => Err(format!(
                    "Error: invalid arguments for {}: {error}. Please fix your mistakes.",
                    call.name
                )),
                Ok(args) => {
                    tracing::info!(tool = tool.name(), "Tool called");
                    tool.call(args)
                        .await
                        .map_err(|error| format!("Error: {error}\n Please fix your mistakes."))
                }
            },
        };

        match result {
            Ok(content) => Message::Tool {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content,
                is_error: false,
            },
            Err(content) => {
                tracing::warn!(tool = %call.name, error = %content, "Tool call failed");
                Message::Tool {
                    call_id: call.id.clone(),
                    name: call.name.clone(),
                    content,
                    is_error: true,
                }
            }
        }
    }
}

//! Prompt templates.
//!
//! Templates use `{name}` placeholders. [`fill`] substitutes every placeholder and fails when a
//! template references a variable the caller did not supply, so a typo never reaches the model
//! as literal braces.

use thiserror::Error;

/// Prompt for `answer_query_tool`. Variables: `context`, `question`.
pub const ANSWER_QUERY: &str = r#"
You are an expert physics teacher helping students by answering questions from the 10th Class Physics textbook.

CONTEXT:
{context}

QUESTION: {question}
Answer the question based strictly on the above context. Keep your answer clear, concise, and based on the book. Do not make up anything not mentioned in the book.

YOUR ANSWER:
"#;

/// Prompt for `generate_important_questions_tool`. Variables: `chapter_or_topic`.
pub const GENERATE_IMPORTANT_QUESTIONS: &str = r#"
You are a 10th Class Physics teacher preparing students for board exams.

Generate important board-style questions from the following topic/chapter:
"{chapter_or_topic}"

Make sure the questions are:
- Relevant to the curriculum
- A mix of theoretical, conceptual, and numerical
- Well-formatted like actual exam questions

Don't provide answers, only the questions.
"#;

/// Prompt for `summarize_chapter_tool`. Variables: `chapter_text`.
pub const SUMMARIZE_CHAPTER: &str = r#"
You are summarizing content from a 10th Class Physics chapter for a teacher who wants to understand the key points before generating exam questions.

Summarize the following chapter content into:
- 3-5 key concepts
- Any important formulas
- Real-world applications (if any)

Text:
{chapter_text}
"#;

/// Table summarization prompt. Variables: `element` (table HTML).
pub const TABLE_SUMMARY: &str = "You are an AI Assistant tasked with summarizing tables for retrieval. \
These summaries will be embedded and used to retrieve the raw table elements. \
Give a concise summary of the table that is well optimized for retrieval. Table: {element}";

/// Text summarization prompt. Variables: `text`.
pub const TEXT_SUMMARY: &str = "Summarize the following content for semantic retrieval:\n\n{text}";

/// Image summarization prompt sent alongside the image bytes. No variables.
pub const IMAGE_SUMMARY: &str = "You are an assistant tasked with summarizing images for retrieval. \
These summaries will be embedded and used to retrieve the raw image. \
Give a concise summary of the image that is well optimized for retrieval.";

/// Errors raised while filling a template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    /// Template referenced a variable that was not provided.
    #[error("missing prompt variable '{0}'")]
    MissingVariable(String),
    /// Template opened a placeholder without closing it.
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
}

/// Substitute `{name}` placeholders in `template` with the matching `vars` entry.
///
/// Text that is not a valid identifier between braces is copied verbatim, which keeps JSON-like
/// snippets inside templates intact.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(PromptError::Unterminated(consumed + open));
        };
        let name = &after[..close];
        if is_identifier(name) {
            let value = vars
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| PromptError::MissingVariable(name.to_string()))?;
            output.push_str(value);
        } else {
            output.push('{');
            output.push_str(name);
            output.push('}');
        }
        let advance = open + 1 + close + 1;
        consumed += advance;
        rest = &rest[advance..];
    }

    output.push_str(rest);
    Ok(output)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

//! Prompt templates with named `{slot}` placeholders.
//!
//! Instruction text, retrieved context, and the question are kept apart
//! until [`PromptTemplate::render`] fills the slots, so each piece can be
//! tested on its own.

use crate::error::RaglineError;
use crate::models::RetrievedChunk;

/// Instruction prepended to the raw question by the query rewriter.
pub const REWRITE_INSTRUCTION: &str = "You are a helpful assistant that corrects spelling and grammar. \
Please improve the following sentence by correcting any spelling mistakes and grammatical errors. \
Only return the corrected sentence, without any additional commentary:\n";

/// Default "stuff everything into one prompt" template for answering from context.
pub const DEFAULT_RAG_TEMPLATE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\n\
Question: {question}\n\
Helpful Answer:";

/// Separator placed between retrieved chunks in the `{context}` slot.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_RAG_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Slot names referenced by the template, in order of appearance.
    pub fn slots(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_slot_name(&after[..close]) => {
                    out.push(&after[..close]);
                    rest = &after[close + 1..];
                }
                _ => rest = after,
            }
        }
        out
    }

    /// Fill every slot. A slot without a value is an error; extra values
    /// are ignored. Substituted values are not re-scanned for slots.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, RaglineError> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_slot_name(&after[..close]) => {
                    let name = &after[..close];
                    let value = values
                        .iter()
                        .find(|(k, _)| *k == name)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| RaglineError::MissingTemplateSlot(name.to_string()))?;
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}

fn is_slot_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build the rewriter prompt for `question`.
pub fn rewrite_prompt(question: &str) -> String {
    format!("{}{}", REWRITE_INSTRUCTION, question)
}

/// Join retrieved chunk texts into a single context block.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

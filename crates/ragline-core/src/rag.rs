//! Retrieval-augmented answering.
//!
//! ```text
//! question ─▶ QueryRewriter ─▶ VectorStore::retrieve(k) ─▶ PromptTemplate ─▶ Generator
//!                                                                              │
//!                       Conversation ◀── (original question, answer) ◀─────────┘
//! ```
//!
//! The rewritten question drives retrieval and the prompt; the original
//! question is what gets logged in the conversation. Retrieval does not read
//! the conversation.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::conversation::Conversation;
use crate::generation::{Generator, Message};
use crate::models::RetrievedChunk;
use crate::prompt::{format_context, PromptTemplate};
use crate::rewrite::QueryRewriter;
use crate::store::{VectorStore, DEFAULT_TOP_K};

/// Which path produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOrigin {
    Rag,
    Chat,
}

impl AnswerOrigin {
    /// Human-readable tag prefixed to the answer text.
    pub fn tag(&self) -> &'static str {
        match self {
            AnswerOrigin::Rag => "Answer (RAG):",
            AnswerOrigin::Chat => "Answer (LLM only):",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub origin: AnswerOrigin,
    pub text: String,
    pub question: String,
    /// The rewritten question (RAG path only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_question: Option<String>,
    /// Retrieved context (RAG path only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RetrievedChunk>,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.origin.tag(), self.text)
    }
}

pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    rewriter: QueryRewriter,
    template: PromptTemplate,
    top_k: usize,
}

impl RagEngine {
    /// Build an engine whose rewriter shares `generator`.
    pub fn new(store: Arc<dyn VectorStore>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            rewriter: QueryRewriter::new(generator.clone()),
            generator,
            template: PromptTemplate::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_rewriter(mut self, rewriter: QueryRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Rewrite, retrieve, generate, and record the turn in `conversation`.
    pub async fn answer(&self, conversation: &mut Conversation, question: &str) -> Result<Answer> {
        let rewritten = self.rewriter.rewrite(question).await?;

        let sources = self.store.retrieve(&rewritten, self.top_k).await?;
        debug!(query = %rewritten, hits = sources.len(), "retrieved context");

        let context = format_context(&sources);
        let prompt = self
            .template
            .render(&[("context", context.as_str()), ("question", rewritten.as_str())])?;
        let text = self.generator.generate(&[Message::user(prompt)]).await?;

        conversation.push_user(question);
        conversation.push_assistant(text.clone());

        Ok(Answer {
            origin: AnswerOrigin::Rag,
            text,
            question: question.to_string(),
            rewritten_question: Some(rewritten),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::chunk::ChunkSplitter;
    use crate::embedding::Embedder;
    use crate::generation::Role;
    use crate::models::Document;
    use crate::store::memory::InMemoryVectorStore;

    /// One-hot embedding on a few keywords.
    struct Keywords;

    #[async_trait]
    impl Embedder for Keywords {
        fn model_name(&self) -> &str {
            "keywords"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    ["rust", "python", "cooking"]
                        .iter()
                        .map(|k| if t.contains(k) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    /// Replies to the rewrite prompt with a fixed question; echoes otherwise.
    struct Scripted {
        rewrite_to: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, messages: &[Message]) -> Result<String> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(last.clone());
            if last.starts_with("You are a helpful assistant that corrects") {
                Ok(self.rewrite_to.clone())
            } else {
                Ok("generated answer".to_string())
            }
        }
    }

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(Keywords)));
        let splitter = ChunkSplitter::default();
        let docs = [
            Document::new("Rust has ownership and borrowing.", "rust.txt"),
            Document::new("Python uses indentation.", "python.txt"),
            Document::new("Cooking pasta takes ten minutes.", "cooking.txt"),
        ];
        store.upsert(&splitter.split_documents(&docs)).await.unwrap();
        store.persist().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_answer_uses_rewritten_question_for_retrieval() {
        let store = seeded_store().await;
        let model = Arc::new(Scripted {
            rewrite_to: "How does Rust manage memory?".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let engine = RagEngine::new(store, model.clone()).with_top_k(1);
        let mut convo = Conversation::new();

        let answer = engine.answer(&mut convo, "how dose rsut manage memroy").await.unwrap();

        assert_eq!(answer.origin, AnswerOrigin::Rag);
        assert_eq!(answer.text, "generated answer");
        assert_eq!(
            answer.rewritten_question.as_deref(),
            Some("How does Rust manage memory?")
        );
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].metadata.source, "rust.txt");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("Rust has ownership and borrowing."));
        assert!(prompts[1].contains("Question: How does Rust manage memory?"));
        assert!(!prompts[1].contains("Cooking pasta"));
    }

    #[tokio::test]
    async fn test_answer_logs_original_question() {
        let store = seeded_store().await;
        let model = Arc::new(Scripted {
            rewrite_to: "Tell me about Python.".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let engine = RagEngine::new(store, model);
        let mut convo = Conversation::new();

        engine.answer(&mut convo, "tel me abt pyton").await.unwrap();

        assert_eq!(convo.len(), 2);
        assert_eq!(convo.turns()[0].role, Role::User);
        assert_eq!(convo.turns()[0].content, "tel me abt pyton");
        assert_eq!(convo.turns()[1].content, "generated answer");
    }

    #[tokio::test]
    async fn test_answer_is_tagged_as_rag() {
        let store = seeded_store().await;
        let model = Arc::new(Scripted {
            rewrite_to: "q".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let engine = RagEngine::new(store, model);
        let answer = engine.answer(&mut Conversation::new(), "q").await.unwrap();
        assert_eq!(answer.to_string(), "Answer (RAG): generated answer");
    }

    #[tokio::test]
    async fn test_empty_store_still_answers() {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(Keywords)));
        let model = Arc::new(Scripted {
            rewrite_to: "anything".to_string(),
            prompts: Mutex::new(Vec::new()),
        });
        let engine = RagEngine::new(store, model);
        let answer = engine.answer(&mut Conversation::new(), "anything").await.unwrap();
        assert!(answer.sources.is_empty());
        assert_eq!(answer.text, "generated answer");
    }
}

//! Text generation capability.
//!
//! A [`Generator`] takes an ordered sequence of role-tagged [`Message`]s and
//! returns the model's reply. A single prompt string is sent as a one-message
//! user sequence via [`Generator::complete`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a conversation, or one part of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A language-model backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash-lite"`).
    fn model_name(&self) -> &str;

    /// Generate a reply to an ordered message sequence.
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Generate a reply to a single prompt string.
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(&[Message::user(prompt)]).await
    }
}

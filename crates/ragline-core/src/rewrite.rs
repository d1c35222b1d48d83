//! Query rewriting: fix spelling and grammar before retrieval.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::generation::Generator;
use crate::prompt::rewrite_prompt;

pub struct QueryRewriter {
    generator: Arc<dyn Generator>,
    fallback_on_empty: bool,
}

impl QueryRewriter {
    /// A rewriter that falls back to the raw question when the model
    /// returns nothing usable.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            fallback_on_empty: true,
        }
    }

    /// When false, an empty model reply is passed through as the query.
    pub fn fallback_on_empty(mut self, enabled: bool) -> Self {
        self.fallback_on_empty = enabled;
        self
    }

    /// Send the correction instruction plus `question` to the model and
    /// return its trimmed reply. Model errors propagate; there is no retry
    /// at this layer.
    pub async fn rewrite(&self, question: &str) -> Result<String> {
        let reply = self.generator.complete(&rewrite_prompt(question)).await?;
        let rewritten = reply.trim().to_string();

        if rewritten.is_empty() && self.fallback_on_empty {
            warn!(question, "rewriter returned an empty question; using the original");
            return Ok(question.trim().to_string());
        }

        debug!(original = question, rewritten = %rewritten, "rewrote question");
        Ok(rewritten)
    }
}

//! Text generation providers.
//!
//! | Config value | Provider | Endpoint |
//! |--------------|----------|----------|
//! | `"gemini"` | [`GeminiGenerator`] | `v1beta/models/{model}:generateContent` |
//! | `"openai"` | [`OpenAIGenerator`] | `/v1/chat/completions` (OpenAI or compatible) |
//! | `"ollama"` | [`OllamaGenerator`] | `/api/chat` |
//!
//! All three take the whole message sequence in one request and share the
//! retry policy in [`crate::http`].

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use ragline_core::generation::{Generator, Message, Role};

use crate::config::{Config, GenerationConfig};
use crate::embedding::{gemini_model_path, GEMINI_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL};
use crate::http;

/// Build the generator named by `config.generation.provider`.
pub fn create_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    let gen_config = &config.generation;
    match gen_config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(gen_config, config.api_key()?)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(gen_config, config.api_key()?)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(gen_config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Gemini ============

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
        })
    }
}

/// Gemini has no system role in `contents`; system messages go to
/// `systemInstruction` and assistant turns are sent as role `model`.
fn gemini_chat_body(messages: &[Message], temperature: Option<f32>) -> serde_json::Value {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for m in messages {
        match m.role {
            Role::System => system.push(serde_json::json!({ "text": m.content })),
            Role::User | Role::Assistant => {
                let role = if m.role == Role::User { "user" } else { "model" };
                contents.push(serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                }));
            }
        }
    }

    let mut body = serde_json::json!({ "contents": contents });
    if !system.is_empty() {
        body["systemInstruction"] = serde_json::json!({ "parts": system });
    }
    if let Some(t) = temperature {
        body["generationConfig"] = serde_json::json!({ "temperature": t });
    }
    body
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_reply(json: &serde_json::Value) -> Result<String> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            anyhow!("Gemini returned no answer: {}", reason)
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("Invalid Gemini response: missing content parts"))?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<String>())
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.base_url,
            gemini_model_path(&self.model)
        );
        let body = gemini_chat_body(messages, self.temperature);
        let json = http::send_json("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;
        parse_gemini_reply(&json)
    }
}

// ============ OpenAI-compatible ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
    base_url: String,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        })
    }
}

fn chat_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

fn parse_openai_reply(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(messages),
        });
        if let Some(t) = self.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        let json = http::send_json("OpenAI", self.max_retries, || {
            self.client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
        })
        .await?;
        parse_openai_reply(&json)
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    temperature: Option<f32>,
    max_retries: u32,
    url: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
        })
    }
}

fn parse_ollama_reply(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing message.content"))
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/api/chat", self.url);
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": chat_messages(messages),
            "stream": false,
        });
        if let Some(t) = self.temperature {
            body["options"] = serde_json::json!({ "temperature": t });
        }
        let json = http::send_json("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(|e| anyhow!("{} (is Ollama running at {}?)", e, self.url))?;
        parse_ollama_reply(&json)
    }
}

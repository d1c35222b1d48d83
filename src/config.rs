//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working Gemini-backed setup. See [`load_config`] for the
//! validation rules.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ragline_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use ragline_core::store::DEFAULT_TOP_K;
use ragline_core::RaglineError;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./ragline.toml";

/// Embedding providers that run without a credential.
const OFFLINE_EMBEDDING_PROVIDERS: &[&str] = &["noop", "local", "ollama"];

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub loader: LoaderConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub rag: RagConfig,
    pub conversation: ConversationConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
        }
    }
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("vector_db")
}

/// What the loader does with a file it cannot read or parse.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_pdf_folder")]
    pub pdf_folder: PathBuf,
    #[serde(default = "default_txt_folder")]
    pub txt_folder: PathBuf,
    #[serde(default)]
    pub on_error: OnError,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            pdf_folder: default_pdf_folder(),
            txt_folder: default_txt_folder(),
            on_error: OnError::Abort,
        }
    }
}

fn default_pdf_folder() -> PathBuf {
    PathBuf::from("pdfs")
}
fn default_txt_folder() -> PathBuf {
    PathBuf::from("txts")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    /// Base URL override (Ollama, or an OpenAI-compatible endpoint).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_embedding_model() -> String {
    "models/embedding-001".to_string()
}
fn default_dims() -> usize {
    768
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_generation_model(),
            temperature: None,
            max_retries: default_max_retries(),
            timeout_secs: default_generation_timeout(),
            url: None,
        }
    }
}

fn default_generation_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}
fn default_generation_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagConfig {
    /// Use the raw question when the rewriter returns nothing.
    #[serde(default = "default_true")]
    pub fallback_on_empty_rewrite: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            fallback_on_empty_rewrite: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConversationConfig {
    /// Trailing turns sent on the plain chat path. Unset sends everything.
    #[serde(default)]
    pub history_window: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

impl Config {
    /// Path of the SQLite file inside the persist directory.
    pub fn index_path(&self) -> PathBuf {
        self.store.persist_dir.join("index.sqlite")
    }

    /// Whether the embedding provider needs the API credential.
    pub fn embedding_needs_credential(&self) -> bool {
        !OFFLINE_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str())
    }

    /// Whether the generation provider needs the API credential.
    pub fn generation_needs_credential(&self) -> bool {
        self.generation.provider != "ollama"
    }

    /// Fail early if a configured remote provider has no credential.
    ///
    /// `uses_generation` is false for commands that only embed.
    pub fn check_credential(&self, uses_embedding: bool, uses_generation: bool) -> Result<()> {
        let needed = (uses_embedding && self.embedding_needs_credential())
            || (uses_generation && self.generation_needs_credential());
        if needed {
            self.api_key()?;
        }
        Ok(())
    }

    /// Read the credential named by `auth.api_key_env`.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.auth.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RaglineError::MissingCredential(self.auth.api_key_env.clone()).into()),
        }
    }
}

/// Load and validate the config at `path`.
///
/// When `explicit` is false and the file does not exist, built-in defaults
/// are used instead.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    // Embedding
    if config.embedding.dims == 0 {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "gemini" | "openai" | "ollama" | "noop" | "local" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be gemini, openai, ollama, noop, or local.",
            other
        ),
    }

    // Generation
    match config.generation.provider.as_str() {
        "gemini" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be gemini, openai, or ollama.",
            other
        ),
    }

    if config.conversation.history_window == Some(0) {
        bail!("conversation.history_window must be >= 1 when set");
    }

    Ok(())
}

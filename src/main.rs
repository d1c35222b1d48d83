//! # ragline CLI
//!
//! The `ragline` binary ingests PDF and text folders into a persistent
//! vector index and answers questions against it.
//!
//! ## Usage
//!
//! ```bash
//! ragline --config ./ragline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragline init` | Create the index and record the embedding model |
//! | `ragline ingest <pdf\|txt\|all>` | Index new documents; unchanged ones are skipped |
//! | `ragline ask "<question>"` | Answer one question |
//! | `ragline chat` | Interactive question/answer session |
//! | `ragline status` | Show what is indexed |
//!
//! Diagnostics go to stderr and are controlled by `RAGLINE_LOG`
//! (e.g. `RAGLINE_LOG=ragline=debug`). Results go to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ragline::ask::{run_ask, run_chat};
use ragline::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use ragline::embedding::create_embedder;
use ragline::ingest::{run_ingest, IngestTarget};
use ragline::sqlite_store::SqliteStore;
use ragline::status::run_status;

/// ragline: deduplicating document ingestion and retrieval-augmented
/// question answering.
#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Ingest PDF and text documents into a vector index and ask questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./ragline.toml`; if that file does not exist, built-in
    /// defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index in the persist directory.
    ///
    /// Records the embedding model and dimension so later runs with an
    /// incompatible model are rejected. Idempotent.
    Init,

    /// Index documents that are not in the store yet.
    ///
    /// Documents are matched by a hash of their full text, so renamed or
    /// copied files are not indexed twice.
    Ingest {
        /// Which folder(s) to ingest.
        #[arg(value_enum)]
        target: IngestTarget,

        /// Read from this folder instead of the configured one (pdf/txt only).
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a single question.
    Ask {
        /// The question.
        question: String,

        /// Answer from the language model alone, without retrieval.
        #[arg(long)]
        no_rag: bool,
    },

    /// Start an interactive session. Type /bye, bye, exit, or quit to leave.
    Chat {
        /// Answer from the language model alone, keeping conversation history.
        #[arg(long)]
        no_rag: bool,
    },

    /// Show index location, size, embedding model, and per-source counts.
    Status,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAGLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load `.env` from the working directory, if there is one.
///
/// Runs before tracing is set up so `RAGLINE_LOG` may come from the file.
fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(anyhow::Error::new(e).context("Failed to load .env file")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv()?;
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path, true)?,
        None => load_config(&PathBuf::from(DEFAULT_CONFIG_PATH), false)?,
    };

    match cli.command {
        Commands::Init => {
            config.check_credential(true, false)?;
            run_init(&config).await?;
        }
        Commands::Ingest {
            target,
            folder,
            dry_run,
        } => {
            config.check_credential(true, false)?;
            run_ingest(&config, target, folder, dry_run).await?;
        }
        Commands::Ask { question, no_rag } => {
            config.check_credential(!no_rag, true)?;
            run_ask(&config, &question, !no_rag).await?;
        }
        Commands::Chat { no_rag } => {
            config.check_credential(!no_rag, true)?;
            run_chat(&config, !no_rag).await?;
        }
        Commands::Status => {
            run_status(&config).await?;
        }
    }

    Ok(())
}

async fn run_init(config: &Config) -> Result<()> {
    let embedder = create_embedder(config)?;
    let model = embedder.model_name().to_string();
    let dims = embedder.dims();
    let store = SqliteStore::open(&config.store.persist_dir, Arc::clone(&embedder)).await?;
    store.pool().close().await;
    println!(
        "Index ready at {} (embedding: {}, {} dims)",
        config.index_path().display(),
        model,
        dims
    );
    Ok(())
}

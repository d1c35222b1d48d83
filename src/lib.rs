//! # ragline
//!
//! Incremental, deduplicating ingestion of PDF and text documents into a
//! persistent vector index, plus retrieval-augmented question answering
//! over what was ingested.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐
//! │ pdfs/ txts/ │──▶│ hash → dedup →   │──▶│ SQLite index  │
//! │  (loader)   │   │ split → embed    │   │ vector_db/    │
//! └─────────────┘   └──────────────────┘   └──────┬────────┘
//!                                                 │ top-k
//!    question ──▶ rewrite ──▶ retrieve ◀──────────┘
//!                                │
//!                                ▼
//!                          generate ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragline init                  # create the index
//! ragline ingest all            # index pdfs/ and txts/
//! ragline ask "what does the report conclude?"
//! ragline chat                  # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`loader`] | Folder scanning into documents |
//! | [`extract`] | PDF and text extraction |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Text generation providers |
//! | [`http`] | Retry and backoff for provider calls |
//! | [`sqlite_store`] | Persistent vector store |
//! | [`ingest`] | The `ingest` command |
//! | [`ask`] | The `ask` and `chat` commands |
//! | [`status`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Chunking, hashing, deduplication and the RAG pipeline live in the
//! `ragline-core` crate.

pub mod ask;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod migrate;
pub mod sqlite_store;
pub mod status;

//! # ragline core
//!
//! Runtime-agnostic logic for ragline: data models, content hashing,
//! chunk splitting, the embedding/generation/store traits, dedup planning,
//! and the question-answering pipeline (rewrite → retrieve → generate).
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem code. The
//! `ragline` application crate supplies the concrete SQLite store, the
//! HTTP model providers, and the document loader.

pub mod chat;
pub mod chunk;
pub mod conversation;
pub mod dedup;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod hash;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod rewrite;
pub mod store;

pub use error::RaglineError;

//! Typed errors that callers branch on.
//!
//! Everything else travels as [`anyhow::Error`]; these variants are wrapped
//! into it as well and can be recovered with `downcast_ref::<RaglineError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaglineError {
    /// The store was built with an embedding model of a different dimensionality.
    #[error(
        "embedding dimension mismatch: store at {store} holds {stored}-dim vectors, \
         configured embedder produces {configured}-dim vectors"
    )]
    DimensionMismatch {
        store: String,
        stored: usize,
        configured: usize,
    },

    /// A remote provider is configured but its credential is absent.
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// A source file could not be read or parsed.
    #[error("failed to extract text from {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// A prompt template references a slot that was not supplied.
    #[error("prompt template slot '{{{0}}}' was not provided")]
    MissingTemplateSlot(String),

    /// Chunk splitter parameters are unusable.
    #[error("invalid chunking parameters: chunk_size={size}, chunk_overlap={overlap}")]
    InvalidChunking { size: usize, overlap: usize },
}

//! Core data models used throughout ragline.
//!
//! These types represent the documents, chunks, and indexed records that
//! flow through the ingestion pipeline, plus the retrieval results consumed
//! by the question-answering path.

use serde::{Deserialize, Serialize};

use crate::hash::content_hash;

/// A loaded source document: full text plus its origin and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    /// Source label, e.g. the file name the text was read from.
    pub source: String,
    /// SHA-256 of `text`. Independent of `source`.
    pub content_hash: String,
}

impl Document {
    /// Build a document, fingerprinting its text.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        let text = text.into();
        let content_hash = content_hash(&text);
        Self {
            text,
            source: source.into(),
            content_hash,
        }
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: self.source.clone(),
            content_hash: self.content_hash.clone(),
        }
    }
}

/// Metadata every chunk inherits from its parent document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub content_hash: String,
}

/// A bounded slice of one document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: i64,
    /// Byte offset of `text` within the parent document's text.
    pub start_offset: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A chunk together with its embedding, as held by a vector store.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned by nearest-neighbor retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query embedding.
    pub score: f64,
}

//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the gateway between the pipeline and a
//! nearest-neighbor index. A store owns its [`Embedder`]: chunks go in as
//! text and are embedded on [`upsert`](VectorStore::upsert); queries go in
//! as text and are embedded with the same model on
//! [`retrieve`](VectorStore::retrieve).
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`read_all_metadata`](VectorStore::read_all_metadata) | Metadata of every persisted record |
//! | [`upsert`](VectorStore::upsert) | Embed chunks and stage them as new records |
//! | [`persist`](VectorStore::persist) | Flush staged records to durable storage |
//! | [`retrieve`](VectorStore::retrieve) | k nearest persisted records to a query |
//!
//! Upserted records become visible to reads only after `persist`. A store
//! never deduplicates; that is the caller's job (see [`crate::dedup`]).

pub mod memory;

use std::cmp::Ordering;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, Embedder};
use crate::models::{Chunk, ChunkMetadata, IndexedRecord, RetrievedChunk};

/// Default number of chunks returned by retrieval.
pub const DEFAULT_TOP_K: usize = 4;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Returns every persisted record's metadata, without text or vectors.
    ///
    /// Cost is linear in the store size.
    async fn read_all_metadata(&self) -> Result<Vec<ChunkMetadata>>;

    /// Embed `chunks` and stage one new record per chunk.
    ///
    /// Returns the number of records staged.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Write all staged records to durable storage.
    ///
    /// Returns the number of records written.
    async fn persist(&self) -> Result<usize>;

    /// Embed `query` and return the `k` most similar persisted records,
    /// best first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Embed chunks in batches of `batch_size`, checking every vector's length.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<Vec<IndexedRecord>> {
    let mut records = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "Embedder {} returned {} vectors for {} texts",
                embedder.model_name(),
                vectors.len(),
                batch.len()
            );
        }
        for (chunk, embedding) in batch.iter().zip(vectors) {
            if embedding.len() != embedder.dims() {
                bail!(
                    "Embedder {} returned a {}-dim vector, expected {}",
                    embedder.model_name(),
                    embedding.len(),
                    embedder.dims()
                );
            }
            records.push(IndexedRecord {
                chunk: chunk.clone(),
                embedding,
            });
        }
    }

    Ok(records)
}

/// Score `records` against `query_vec` and keep the best `k`.
pub fn rank<'a, I>(query_vec: &[f32], records: I, k: usize) -> Vec<RetrievedChunk>
where
    I: IntoIterator<Item = (&'a Chunk, &'a [f32])>,
{
    let mut scored: Vec<RetrievedChunk> = records
        .into_iter()
        .map(|(chunk, vector)| RetrievedChunk {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            metadata: chunk.metadata.clone(),
            score: cosine_similarity(query_vec, vector) as f64,
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}

//! In-memory [`VectorStore`] implementation for tests and embedding callers.
//!
//! Records live in `Vec`s behind `std::sync::RwLock`. "Persisting" moves
//! staged records into the readable set; nothing touches disk. Retrieval is
//! brute-force cosine similarity over all persisted records.

use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::{embed_one, Embedder};
use crate::models::{Chunk, ChunkMetadata, IndexedRecord, RetrievedChunk};

use super::{embed_chunks, rank, VectorStore};

const DEFAULT_BATCH_SIZE: usize = 64;

pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    staged: RwLock<Vec<IndexedRecord>>,
    records: RwLock<Vec<IndexedRecord>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            staged: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records upserted but not yet persisted.
    pub fn staged_len(&self) -> usize {
        self.staged.read().map(|r| r.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory vector store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn read_all_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().map(|r| r.chunk.metadata.clone()).collect())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        let new_records = embed_chunks(self.embedder.as_ref(), chunks, self.batch_size).await?;
        let count = new_records.len();
        self.staged.write().map_err(poisoned)?.extend(new_records);
        Ok(count)
    }

    async fn persist(&self) -> Result<usize> {
        let drained: Vec<IndexedRecord> = self.staged.write().map_err(poisoned)?.drain(..).collect();
        let count = drained.len();
        self.records.write().map_err(poisoned)?.extend(drained);
        Ok(count)
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        let records = self.records.read().map_err(poisoned)?;
        Ok(rank(
            &query_vec,
            records
                .iter()
                .map(|r| (&r.chunk, r.embedding.as_slice())),
            k,
        ))
    }
}

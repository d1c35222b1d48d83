//! SQLite-backed [`VectorStore`] implementation.
//!
//! The persist directory holds a single `index.sqlite`. Each chunk is one
//! row of `records` carrying its text, metadata, and embedding as a
//! little-endian `f32` BLOB. The `store_meta` table remembers which
//! embedding model and dimension the index was built with.
//!
//! Upserted records are held in memory until [`VectorStore::persist`]
//! writes them in one transaction. Retrieval is a brute-force cosine scan
//! over every persisted row.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ragline_core::embedding::{blob_to_vec, embed_one, vec_to_blob, Embedder};
use ragline_core::models::{Chunk, ChunkMetadata, IndexedRecord, RetrievedChunk};
use ragline_core::store::{embed_chunks, rank, VectorStore};
use ragline_core::RaglineError;

use crate::db;
use crate::migrate;

const META_MODEL: &str = "embedding_model";
const META_DIMS: &str = "embedding_dims";
const DEFAULT_BATCH_SIZE: usize = 64;

pub struct SqliteStore {
    pool: SqlitePool,
    persist_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    staged: Mutex<Vec<IndexedRecord>>,
}

impl SqliteStore {
    /// Open or create the index in `persist_dir` for `embedder`.
    ///
    /// The first open records the embedder's model and dimension. Later
    /// opens fail with [`RaglineError::DimensionMismatch`] if the dimension
    /// differs, and only warn if the model name differs.
    pub async fn open(persist_dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let pool = db::connect(persist_dir).await?;
        migrate::run_migrations(&pool).await?;

        let store = Self {
            pool,
            persist_dir: persist_dir.to_path_buf(),
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            staged: Mutex::new(Vec::new()),
        };
        store.check_embedding_meta().await?;
        Ok(store)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    async fn check_embedding_meta(&self) -> Result<()> {
        let model = self.embedder.model_name().to_string();
        let dims = self.embedder.dims();

        match read_embedding_meta(&self.pool).await? {
            None => {
                let mut tx = self.pool.begin().await?;
                for (key, value) in [(META_MODEL, model.clone()), (META_DIMS, dims.to_string())] {
                    sqlx::query("INSERT OR REPLACE INTO store_meta (key, value) VALUES (?, ?)")
                        .bind(key)
                        .bind(value)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await?;
                info!(model = %model, dims, dir = %self.persist_dir.display(), "initialized store");
            }
            Some((stored_model, stored_dims)) => {
                if stored_dims != dims {
                    return Err(RaglineError::DimensionMismatch {
                        store: self.persist_dir.display().to_string(),
                        stored: stored_dims,
                        configured: dims,
                    }
                    .into());
                }
                if stored_model != model {
                    warn!(
                        stored = %stored_model,
                        configured = %model,
                        "store was built with a different embedding model of the same dimension"
                    );
                }
            }
        }
        Ok(())
    }

    /// Number of records staged by `upsert` and not yet persisted.
    pub async fn staged_len(&self) -> usize {
        self.staged.lock().await.len()
    }
}

/// Read the embedding model and dimension recorded for an index, if any.
pub async fn read_embedding_meta(pool: &SqlitePool) -> Result<Option<(String, usize)>> {
    let rows = sqlx::query("SELECT key, value FROM store_meta WHERE key IN (?, ?)")
        .bind(META_MODEL)
        .bind(META_DIMS)
        .fetch_all(pool)
        .await?;

    let mut model = None;
    let mut dims = None;
    for row in &rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            META_MODEL => model = Some(value),
            META_DIMS => {
                dims = Some(
                    value
                        .parse::<usize>()
                        .with_context(|| format!("Corrupt store_meta dims: {}", value))?,
                )
            }
            _ => {}
        }
    }

    Ok(model.zip(dims))
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn read_all_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        let rows = sqlx::query("SELECT source, content_hash FROM records")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| ChunkMetadata {
                source: row.get("source"),
                content_hash: row.get("content_hash"),
            })
            .collect())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        let records = embed_chunks(self.embedder.as_ref(), chunks, self.batch_size).await?;
        let count = records.len();
        self.staged.lock().await.extend(records);
        debug!(count, "staged records");
        Ok(count)
    }

    async fn persist(&self) -> Result<usize> {
        let mut staged = self.staged.lock().await;
        if staged.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in staged.iter() {
            let chunk = &record.chunk;
            sqlx::query(
                r#"
                INSERT INTO records (id, source, content_hash, chunk_index, start_offset,
                                     text, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.metadata.source)
            .bind(&chunk.metadata.content_hash)
            .bind(chunk.chunk_index)
            .bind(chunk.start_offset as i64)
            .bind(&chunk.text)
            .bind(vec_to_blob(&record.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let written = staged.len();
        staged.clear();
        info!(written, "persisted records");
        Ok(written)
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_vec = embed_one(self.embedder.as_ref(), query).await?;

        let rows = sqlx::query(
            "SELECT id, source, content_hash, chunk_index, start_offset, text, embedding FROM records",
        )
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<(Chunk, Vec<f32>)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let start_offset: i64 = row.get("start_offset");
                let chunk = Chunk {
                    id: row.get("id"),
                    chunk_index: row.get("chunk_index"),
                    start_offset: start_offset as usize,
                    text: row.get("text"),
                    metadata: ChunkMetadata {
                        source: row.get("source"),
                        content_hash: row.get("content_hash"),
                    },
                };
                (chunk, blob_to_vec(&blob))
            })
            .collect();

        Ok(rank(
            &query_vec,
            records.iter().map(|(c, v)| (c, v.as_slice())),
            k,
        ))
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Ok(staged) = self.staged.try_lock() {
            if !staged.is_empty() {
                warn!(
                    count = staged.len(),
                    "dropping store with records that were never persisted"
                );
            }
        }
    }
}

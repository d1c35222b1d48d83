//! Index statistics.
//!
//! A quick summary of what's indexed: record and document counts, the
//! embedding model the index was built with, and a per-source breakdown.
//! Used by `ragline status` to confirm that ingestion did what was expected.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::read_embedding_meta;

/// Per-source record and document counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub documents: i64,
    pub records: i64,
}

#[derive(Debug, Clone)]
pub struct IndexStats {
    pub records: i64,
    pub documents: i64,
    pub embedding: Option<(String, usize)>,
    pub sources: Vec<SourceStats>,
}

pub async fn collect(pool: &SqlitePool) -> Result<IndexStats> {
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await?;

    let documents: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT content_hash) FROM records")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT source,
               COUNT(DISTINCT content_hash) AS documents,
               COUNT(*) AS records
        FROM records
        GROUP BY source
        ORDER BY source
        "#,
    )
    .fetch_all(pool)
    .await?;

    let sources = rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            documents: row.get("documents"),
            records: row.get("records"),
        })
        .collect();

    Ok(IndexStats {
        records,
        documents,
        embedding: read_embedding_meta(pool).await?,
        sources,
    })
}

/// Run the status command: query the index and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let index_path = config.index_path();
    println!("ragline status");
    println!("==============");
    println!();
    println!("  Persist dir: {}", config.store.persist_dir.display());

    if !index_path.exists() {
        println!("  Index:       not created yet (run `ragline init` or `ragline ingest`)");
        return Ok(());
    }

    let pool = db::connect(&config.store.persist_dir).await?;
    crate::migrate::run_migrations(&pool).await?;
    let stats = collect(&pool).await?;
    pool.close().await;

    let size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);
    println!("  Size:        {}", format_bytes(size));
    match &stats.embedding {
        Some((model, dims)) => println!("  Embedding:   {} ({} dims)", model, dims),
        None => println!("  Embedding:   unknown"),
    }
    println!("  Documents:   {}", stats.documents);
    println!("  Records:     {}", stats.records);

    if !stats.sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<40} {:>6} {:>8}", "SOURCE", "DOCS", "RECORDS");
        println!("  {}", "-".repeat(56));
        for s in &stats.sources {
            println!("  {:<40} {:>6} {:>8}", s.source, s.documents, s.records);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ragline_core::chunk::ChunkSplitter;
    use ragline_core::models::Document;
    use ragline_core::store::VectorStore;
    use tempfile::TempDir;

    use crate::embedding::NoopEmbedder;
    use crate::sqlite_store::SqliteStore;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[tokio::test]
    async fn test_collect_counts_documents_and_records() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteStore::open(tmp.path(), Arc::new(NoopEmbedder::new(4)))
            .await
            .unwrap();
        let splitter = ChunkSplitter::new(10, 2).unwrap();
        let docs = [
            Document::new("one two three four five six", "a.txt"),
            Document::new("short", "b.txt"),
        ];
        store.upsert(&splitter.split_documents(&docs)).await.unwrap();
        store.persist().await.unwrap();

        let stats = collect(store.pool()).await.unwrap();
        assert_eq!(stats.documents, 2);
        assert!(stats.records > 2);
        assert_eq!(stats.embedding, Some(("noop".to_string(), 4)));
        assert_eq!(stats.sources.len(), 2);
        assert_eq!(stats.sources[0].source, "a.txt");
        assert_eq!(stats.sources[1].records, 1);
    }
}

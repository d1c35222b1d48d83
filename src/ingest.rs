//! The `ingest` command.
//!
//! Loads documents from the PDF folder, the text folder, or both, then
//! hands them to [`ingest_documents`], which deduplicates by content hash
//! against the persisted index and writes only new documents. Re-running on
//! unchanged folders is a no-op.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use ragline_core::chunk::ChunkSplitter;
use ragline_core::dedup::{ingest_documents, IngestReport};
use ragline_core::models::Document;
use ragline_core::store::memory::InMemoryVectorStore;
use ragline_core::store::VectorStore;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::DocumentKind;
use crate::loader::load_folder;
use crate::sqlite_store::SqliteStore;

/// Which input folder(s) to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IngestTarget {
    Pdf,
    Txt,
    All,
}

impl IngestTarget {
    fn label(&self) -> &'static str {
        match self {
            IngestTarget::Pdf => "pdf",
            IngestTarget::Txt => "txt",
            IngestTarget::All => "all",
        }
    }
}

/// Resolve the folders to scan. `folder` overrides the configured path and
/// is only accepted for a single-kind target.
fn sources(
    config: &Config,
    target: IngestTarget,
    folder: Option<PathBuf>,
) -> Result<Vec<(DocumentKind, PathBuf)>> {
    match (target, folder) {
        (IngestTarget::Pdf, f) => Ok(vec![(
            DocumentKind::Pdf,
            f.unwrap_or_else(|| config.loader.pdf_folder.clone()),
        )]),
        (IngestTarget::Txt, f) => Ok(vec![(
            DocumentKind::Text,
            f.unwrap_or_else(|| config.loader.txt_folder.clone()),
        )]),
        (IngestTarget::All, Some(_)) => {
            bail!("--folder cannot be used with `ingest all`; set loader.pdf_folder and loader.txt_folder instead")
        }
        (IngestTarget::All, None) => Ok(vec![
            (DocumentKind::Pdf, config.loader.pdf_folder.clone()),
            (DocumentKind::Text, config.loader.txt_folder.clone()),
        ]),
    }
}

/// Load every document for `target`.
///
/// With `all`, a folder that does not exist is skipped with a warning; a
/// single-kind target requires its folder.
pub fn load_documents(
    config: &Config,
    target: IngestTarget,
    folder: Option<PathBuf>,
) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for (kind, path) in sources(config, target, folder)? {
        if target == IngestTarget::All && !path.is_dir() {
            warn!(folder = %path.display(), kind = kind.label(), "input folder missing; skipping");
            continue;
        }
        documents.extend(load_folder(&path, kind, config.loader.on_error)?);
    }
    Ok(documents)
}

/// Run ingestion and return the report without printing.
pub async fn ingest(
    config: &Config,
    target: IngestTarget,
    folder: Option<PathBuf>,
    dry_run: bool,
) -> Result<IngestReport> {
    let documents = load_documents(config, target, folder)?;
    let splitter = ChunkSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
    let embedder = create_embedder(config)?;

    // A dry run against a store that does not exist yet must not create it.
    let store: Arc<dyn VectorStore> = if dry_run && !config.index_path().exists() {
        Arc::new(InMemoryVectorStore::new(embedder))
    } else {
        Arc::new(
            SqliteStore::open(&config.store.persist_dir, embedder)
                .await?
                .with_batch_size(config.embedding.batch_size),
        )
    };

    ingest_documents(store.as_ref(), &splitter, documents, dry_run).await
}

/// The `ingest` command: run ingestion and print a summary.
pub async fn run_ingest(
    config: &Config,
    target: IngestTarget,
    folder: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let report = ingest(config, target, folder, dry_run).await?;
    print_report(target, &report);
    Ok(())
}

fn print_report(target: IngestTarget, report: &IngestReport) {
    if report.dry_run {
        println!("ingest {} (dry-run)", target.label());
        println!("  documents loaded: {}", report.loaded);
        println!("  new documents: {}", report.new_documents);
        println!("  already indexed: {}", report.already_indexed);
        println!("  duplicates in batch: {}", report.duplicates_in_batch);
        println!("  empty documents: {}", report.empty_documents);
        println!("  chunks to write: {}", report.chunks);
        return;
    }

    if report.is_up_to_date() {
        println!("No new documents found. Store is up to date.");
    } else {
        println!(
            "Added {} new document(s) to the store.",
            report.new_documents
        );
        println!("  chunks written: {}", report.chunks);
    }
    if report.already_indexed + report.duplicates_in_batch > 0 {
        println!(
            "  skipped: {} already indexed, {} duplicate(s) in this run",
            report.already_indexed, report.duplicates_in_batch
        );
    }
    if report.empty_documents > 0 {
        println!("  empty: {} document(s) with no text", report.empty_documents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn offline_config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.store.persist_dir = root.join("vector_db");
        config.loader.pdf_folder = root.join("pdfs");
        config.loader.txt_folder = root.join("txts");
        config.embedding.provider = "noop".to_string();
        config.embedding.dims = 8;
        config
    }

    #[test]
    fn test_folder_override_rejected_for_all() {
        let tmp = TempDir::new().unwrap();
        let config = offline_config(tmp.path());
        assert!(sources(&config, IngestTarget::All, Some(tmp.path().to_path_buf())).is_err());
        let s = sources(&config, IngestTarget::Txt, Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(s, vec![(DocumentKind::Text, tmp.path().to_path_buf())]);
    }

    #[test]
    fn test_all_skips_missing_folder() {
        let tmp = TempDir::new().unwrap();
        let config = offline_config(tmp.path());
        fs::create_dir(&config.loader.txt_folder).unwrap();
        fs::write(config.loader.txt_folder.join("a.txt"), "alpha").unwrap();

        let docs = load_documents(&config, IngestTarget::All, None).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(load_documents(&config, IngestTarget::Pdf, None).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_create_store() {
        let tmp = TempDir::new().unwrap();
        let config = offline_config(tmp.path());
        fs::create_dir(&config.loader.txt_folder).unwrap();
        fs::write(config.loader.txt_folder.join("a.txt"), "alpha beta").unwrap();

        let report = ingest(&config, IngestTarget::Txt, None, true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.new_documents, 1);
        assert_eq!(report.chunks, 1);
        assert!(!config.store.persist_dir.exists());
    }

    #[tokio::test]
    async fn test_second_run_is_up_to_date() {
        let tmp = TempDir::new().unwrap();
        let config = offline_config(tmp.path());
        fs::create_dir(&config.loader.txt_folder).unwrap();
        fs::write(config.loader.txt_folder.join("a.txt"), "alpha").unwrap();
        fs::write(config.loader.txt_folder.join("b.txt"), "beta").unwrap();

        let first = ingest(&config, IngestTarget::Txt, None, false).await.unwrap();
        assert_eq!(first.new_documents, 2);
        assert_eq!(first.chunks, 2);

        let second = ingest(&config, IngestTarget::Txt, None, false).await.unwrap();
        assert!(second.is_up_to_date());
        assert_eq!(second.already_indexed, 2);
        assert_eq!(second.chunks, 0);
    }
}

//! Content-hash deduplication and the store-facing half of ingestion.
//!
//! The set of already-indexed fingerprints is rebuilt from the store's
//! persisted metadata on every run; nothing is cached between runs. A
//! document whose hash is in that set is assumed to be fully indexed.
//!
//! # Flow
//!
//! 1. [`VectorStore::read_all_metadata`] → [`existing_hashes`].
//! 2. [`plan`] drops documents already indexed, and all but the first of
//!    several loaded documents sharing one hash.
//! 3. Split the rest; documents yielding no chunks are counted as empty.
//! 4. Nothing left → report "up to date", store untouched.
//! 5. Otherwise [`upsert`](VectorStore::upsert), [`persist`](VectorStore::persist).
//!
//! Two processes ingesting into the same store concurrently can both miss
//! a document in step 1 and index it twice; single-writer access is assumed.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::chunk::ChunkSplitter;
use crate::models::{ChunkMetadata, Document};
use crate::store::VectorStore;

/// Collect the distinct content hashes present in `metadata`.
pub fn existing_hashes(metadata: &[ChunkMetadata]) -> HashSet<String> {
    metadata.iter().map(|m| m.content_hash.clone()).collect()
}

/// Documents selected for ingestion, plus what was filtered out.
#[derive(Debug, Default)]
pub struct IngestPlan {
    pub new_documents: Vec<Document>,
    /// Documents whose hash was already in the store.
    pub already_indexed: usize,
    /// Documents repeating the text of an earlier document in the same batch.
    pub duplicates_in_batch: usize,
}

/// Split `documents` into those to ingest and those already covered.
pub fn plan(documents: Vec<Document>, existing: &HashSet<String>) -> IngestPlan {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = IngestPlan::default();

    for doc in documents {
        if existing.contains(&doc.content_hash) {
            debug!(source = %doc.source, hash = %doc.content_hash, "already indexed");
            out.already_indexed += 1;
        } else if !seen.insert(doc.content_hash.clone()) {
            debug!(source = %doc.source, hash = %doc.content_hash, "duplicate of an earlier file in this run");
            out.duplicates_in_batch += 1;
        } else {
            out.new_documents.push(doc);
        }
    }

    out
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub loaded: usize,
    pub new_documents: usize,
    pub already_indexed: usize,
    pub duplicates_in_batch: usize,
    /// New documents skipped because they split into no chunks.
    pub empty_documents: usize,
    /// Records written (or, for a dry run, chunks that would be written).
    pub chunks: usize,
    pub dry_run: bool,
}

impl IngestReport {
    pub fn is_up_to_date(&self) -> bool {
        self.new_documents == 0
    }
}

/// Deduplicate `documents` against `store` and index the rest.
///
/// With `dry_run`, stops after splitting: nothing is embedded or written.
pub async fn ingest_documents(
    store: &dyn VectorStore,
    splitter: &ChunkSplitter,
    documents: Vec<Document>,
    dry_run: bool,
) -> Result<IngestReport> {
    let loaded = documents.len();
    let metadata = store.read_all_metadata().await?;
    let existing = existing_hashes(&metadata);
    debug!(records = metadata.len(), hashes = existing.len(), "read existing metadata");

    let plan = plan(documents, &existing);
    let mut report = IngestReport {
        loaded,
        new_documents: plan.new_documents.len(),
        already_indexed: plan.already_indexed,
        duplicates_in_batch: plan.duplicates_in_batch,
        empty_documents: 0,
        chunks: 0,
        dry_run,
    };

    let mut chunks = Vec::new();
    for doc in &plan.new_documents {
        let doc_chunks = splitter.split_document(doc);
        if doc_chunks.is_empty() {
            warn!(source = %doc.source, "document produced no chunks; skipped");
            report.empty_documents += 1;
            continue;
        }
        chunks.extend(doc_chunks);
    }
    report.new_documents -= report.empty_documents;

    if report.new_documents == 0 {
        info!(loaded, "store is up to date");
        return Ok(report);
    }

    if dry_run {
        report.chunks = chunks.len();
        return Ok(report);
    }

    store.upsert(&chunks).await?;
    report.chunks = store.persist().await?;
    info!(
        documents = report.new_documents,
        records = report.chunks,
        "ingested new documents"
    );

    Ok(report)
}

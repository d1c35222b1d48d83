//! Folder → [`Document`] loading.
//!
//! Scans one flat folder for files of a single [`DocumentKind`], reads each
//! fully into one string, and fingerprints it. Files are returned sorted by
//! name. Extension matching is case-insensitive (`REPORT.PDF` counts).

use anyhow::{bail, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use ragline_core::models::Document;
use ragline_core::RaglineError;

use crate::config::OnError;
use crate::extract::{extract_text, source_label, DocumentKind};

/// Load every `kind` file directly inside `folder`.
///
/// Under [`OnError::Abort`] the first unreadable file fails the whole load;
/// under [`OnError::Skip`] it is logged and left out. Files with only
/// whitespace are always left out: they would produce no chunks.
pub fn load_folder(folder: &Path, kind: DocumentKind, on_error: OnError) -> Result<Vec<Document>> {
    if !folder.is_dir() {
        bail!("Input folder does not exist: {}", folder.display());
    }

    let matcher = build_matcher(kind)?;
    let mut paths = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            paths.push(entry.into_path());
        }
    }

    // Sort for deterministic ordering
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let text = match read_file(path, kind) {
            Ok(text) => text,
            Err(e) if on_error == OnError::Skip => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            warn!(path = %path.display(), "skipping file with no text");
            continue;
        }

        let doc = Document::new(text, source_label(path));
        debug!(source = %doc.source, hash = %doc.content_hash, chars = doc.text.len(), "loaded");
        documents.push(doc);
    }

    Ok(documents)
}

fn read_file(path: &Path, kind: DocumentKind) -> Result<String, RaglineError> {
    let bytes = std::fs::read(path).map_err(|e| RaglineError::Extraction {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    extract_text(bytes, kind).map_err(|e| RaglineError::Extraction {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn build_matcher(kind: DocumentKind) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(kind.glob())
        .case_insensitive(true)
        .literal_separator(true)
        .build()?;
    Ok(glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn folder_with(files: &[(&str, &[u8])]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_loads_matching_files_sorted() {
        let dir = folder_with(&[
            ("b.txt", b"second"),
            ("a.txt", b"first"),
            ("notes.md", b"ignored"),
            ("C.TXT", b"upper"),
        ]);
        let docs = load_folder(dir.path(), DocumentKind::Text, OnError::Abort).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["C.TXT", "a.txt", "b.txt"]);
        assert_eq!(docs[1].text, "first");
        assert_eq!(docs[1].content_hash, ragline_core::hash::content_hash("first"));
    }

    #[test]
    fn test_does_not_descend_into_subfolders() {
        let dir = folder_with(&[("top.txt", b"top")]);
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/deep.txt"), "deep").unwrap();
        let docs = load_folder(dir.path(), DocumentKind::Text, OnError::Abort).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "top.txt");
    }

    #[test]
    fn test_abort_on_bad_file() {
        let dir = folder_with(&[("good.txt", b"fine"), ("bad.txt", &[0xff, 0xfe])]);
        let err = load_folder(dir.path(), DocumentKind::Text, OnError::Abort).unwrap_err();
        match err.downcast_ref::<RaglineError>() {
            Some(RaglineError::Extraction { path, .. }) => {
                assert!(path.ends_with("bad.txt"));
            }
            other => panic!("expected extraction error, got {:?}", other),
        }
    }

    #[test]
    fn test_skip_on_bad_file() {
        let dir = folder_with(&[("good.txt", b"fine"), ("bad.txt", &[0xff, 0xfe])]);
        let docs = load_folder(dir.path(), DocumentKind::Text, OnError::Skip).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "good.txt");
    }

    #[test]
    fn test_whitespace_only_file_is_skipped() {
        let dir = folder_with(&[("blank.txt", b"  \n\t "), ("real.txt", b"content")]);
        let docs = load_folder(dir.path(), DocumentKind::Text, OnError::Abort).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "real.txt");
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_folder(&dir.path().join("nope"), DocumentKind::Pdf, OnError::Abort).is_err());
    }

    #[test]
    fn test_empty_folder_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let docs = load_folder(dir.path(), DocumentKind::Pdf, OnError::Abort).unwrap();
        assert!(docs.is_empty());
    }
}

//! Text extraction for the two supported file kinds.
//!
//! Callers supply bytes and a [`DocumentKind`]; this module returns one
//! UTF-8 string per file.

use std::path::Path;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Glob matched against file names in an input folder.
    pub fn glob(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "*.pdf",
            DocumentKind::Text => "*.txt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
        }
    }
}

/// Extraction error; the loader wraps it with the file path.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Utf8(std::string::FromUtf8Error),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Utf8(e) => write!(f, "not valid UTF-8: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

pub fn extract_text(bytes: Vec<u8>, kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => extract_pdf(&bytes),
        DocumentKind::Text => String::from_utf8(bytes).map_err(ExtractError::Utf8),
    }
}

/// Page texts joined in page order with nothing in between.
///
/// pdf-extract can panic on malformed input; that is reported as an
/// extraction error like any other.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

/// File name used as a document's source label.
pub fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_passthrough() {
        let text = extract_text("héllo\nworld".as_bytes().to_vec(), DocumentKind::Text).unwrap();
        assert_eq!(text, "héllo\nworld");
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let err = extract_text(vec![0xff, 0xfe, 0x00], DocumentKind::Text).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_garbage_pdf_is_error() {
        let err = extract_text(b"not a pdf".to_vec(), DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn test_source_label_is_file_name() {
        assert_eq!(source_label(Path::new("/data/pdfs/report.pdf")), "report.pdf");
    }
}

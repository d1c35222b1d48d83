//! Recursive, overlapping text splitter.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters.
//! Each chunk after the first starts inside the tail of its predecessor so
//! that at most `chunk_overlap` characters are repeated across a boundary.
//!
//! # Algorithm
//!
//! 1. If the remaining text fits in `chunk_size`, emit it and stop.
//! 2. Otherwise look at the next `chunk_size` characters and cut after the
//!    last occurrence of the highest-priority separator found there:
//!    paragraph (`\n\n`), line (`\n`), sentence (`. `), word (` `).
//!    A cut is only accepted if it lies beyond `chunk_overlap`, so every
//!    step makes progress.
//! 3. With no acceptable separator, hard-cut at `chunk_size`.
//! 4. The next chunk starts at the first word boundary within the last
//!    `chunk_overlap` characters of the previous chunk.
//!
//! Lengths are measured in characters, offsets are stored in bytes.
//! Whitespace-only spans are dropped.
//!
//! # Example
//!
//! ```rust
//! use ragline_core::chunk::ChunkSplitter;
//! use ragline_core::models::Document;
//!
//! let splitter = ChunkSplitter::new(1000, 200).unwrap();
//! let doc = Document::new("Hello world.\n\nSecond paragraph.", "a.txt");
//! let chunks = splitter.split_document(&doc);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].metadata.content_hash, doc.content_hash);
//! ```

use uuid::Uuid;

use crate::error::RaglineError;
use crate::models::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A text span produced by [`ChunkSplitter::split_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    /// Byte offset of `text` in the input.
    pub offset: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChunkSplitter {
    /// Create a splitter. `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RaglineError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RaglineError::InvalidChunking {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        })
    }

    /// Replace the separator priority list (highest priority first).
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, in order. Chunks never span documents.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect()
    }

    /// Split one document into chunks carrying its metadata.
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let metadata = document.metadata();
        self.split_text(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, span)| Chunk {
                id: Uuid::new_v4().to_string(),
                chunk_index: i as i64,
                start_offset: span.offset,
                text: span.text.to_string(),
                metadata: metadata.clone(),
            })
            .collect()
    }

    /// Split raw text into overlapping spans.
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        // bounds[c] is the byte offset of char c; bounds[n] == text.len().
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < n {
            let end = if n - start <= self.chunk_size {
                n
            } else {
                self.find_cut(text, &bounds, start)
            };

            let piece = &text[bounds[start]..bounds[end]];
            if !piece.trim().is_empty() {
                spans.push(Span {
                    offset: bounds[start],
                    text: piece,
                });
            }

            if end == n {
                break;
            }
            start = self.next_start(text, &bounds, start, end);
        }

        spans
    }

    /// Pick the end (char position) of the chunk starting at `start`.
    fn find_cut(&self, text: &str, bounds: &[usize], start: usize) -> usize {
        let window_end = start + self.chunk_size;
        let window = &text[bounds[start]..bounds[window_end]];

        for sep in &self.separators {
            if let Some(pos) = window.rfind(sep.as_str()) {
                let cut = start + window[..pos + sep.len()].chars().count();
                if cut - start > self.chunk_overlap {
                    return cut;
                }
            }
        }

        window_end
    }

    /// Pick where the chunk after `[start, end)` begins.
    fn next_start(&self, text: &str, bounds: &[usize], start: usize, end: usize) -> usize {
        if self.chunk_overlap == 0 {
            return end;
        }
        let lo = end.saturating_sub(self.chunk_overlap).max(start + 1);

        // Prefer to begin the overlap at a word start.
        let mut prev_ws = text[..bounds[lo]]
            .chars()
            .next_back()
            .map(char::is_whitespace)
            .unwrap_or(true);
        for (p, c) in text[bounds[lo]..bounds[end]].chars().enumerate() {
            if prev_ws && !c.is_whitespace() {
                return lo + p;
            }
            prev_ws = c.is_whitespace();
        }

        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuild the original text from spans by dropping each overlap.
    fn stitch(text: &str, spans: &[Span<'_>]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for span in spans {
            let span_end = span.offset + span.text.len();
            if span_end > covered {
                let from = covered.max(span.offset);
                out.push_str(&text[from..span_end]);
                covered = span_end;
            }
        }
        out
    }

    #[test]
    fn test_small_text_single_chunk() {
        let splitter = ChunkSplitter::default();
        let spans = splitter.split_text("Hello, world!");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Hello, world!");
        assert_eq!(spans[0].offset, 0);
    }

    #[test]
    fn test_empty_and_blank_text() {
        let splitter = ChunkSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        assert!(ChunkSplitter::new(100, 100).is_err());
        assert!(ChunkSplitter::new(0, 0).is_err());
        assert!(ChunkSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_hard_split_count_matches_stride() {
        let splitter = ChunkSplitter::default();
        for len in [1001usize, 1800, 2500, 3000, 10_000] {
            let text = "x".repeat(len);
            let spans = splitter.split_text(&text);
            let expected = (len - 200).div_ceil(800);
            assert_eq!(spans.len(), expected, "length {}", len);
            assert_eq!(stitch(&text, &spans), text);
        }
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let splitter = ChunkSplitter::new(120, 30).unwrap();
        let text = (0..60)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 7))
            .collect::<Vec<_>>()
            .join(" ");
        let spans = splitter.split_text(&text);
        assert!(spans.len() > 1);
        for pair in spans.windows(2) {
            assert!(pair[0].text.chars().count() <= 120);
            let prev_end = pair[0].offset + pair[0].text.len();
            assert!(pair[1].offset > pair[0].offset, "no progress");
            assert!(pair[1].offset <= prev_end, "gap between chunks");
            let overlap = text[pair[1].offset..prev_end].chars().count();
            assert!(overlap <= 30, "overlap {} too large", overlap);
        }
        assert_eq!(stitch(&text, &spans), text);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = ChunkSplitter::new(60, 10).unwrap();
        let text = "First paragraph is here.\n\nSecond paragraph follows it.\n\nThird one.";
        let spans = splitter.split_text(text);
        assert!(spans[0].text.ends_with("\n\n"));
        assert!(spans[0].text.starts_with("First paragraph"));
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let splitter = ChunkSplitter::new(10, 3).unwrap();
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let spans = splitter.split_text(text);
        assert!(!spans.is_empty());
        for span in &spans {
            assert!(span.text.chars().count() <= 10);
        }
        assert_eq!(stitch(text, &spans), text);
    }

    #[test]
    fn test_deterministic() {
        let splitter = ChunkSplitter::new(50, 10).unwrap();
        let text = "Alpha beta gamma.\n\nDelta epsilon zeta eta theta.\n\nIota kappa lambda mu.";
        let a = splitter.split_text(text);
        let b = splitter.split_text(text);
        assert_eq!(a, b);
    }

    #[test]
    fn test_document_chunks_inherit_metadata() {
        let splitter = ChunkSplitter::new(40, 5).unwrap();
        let doc = Document::new("word ".repeat(40), "notes.txt");
        let chunks = splitter.split_document(&doc);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.metadata.source, "notes.txt");
            assert_eq!(c.metadata.content_hash, doc.content_hash);
            assert_eq!(&doc.text[c.start_offset..c.start_offset + c.text.len()], c.text);
        }
    }

    #[test]
    fn test_split_documents_keeps_documents_apart() {
        let splitter = ChunkSplitter::new(20, 5).unwrap();
        let docs = vec![
            Document::new("aaaa bbbb cccc dddd eeee", "a.txt"),
            Document::new("ffff gggg", "b.txt"),
        ];
        let chunks = splitter.split_documents(&docs);
        let from_b: Vec<_> = chunks
            .iter()
            .filter(|c| c.metadata.source == "b.txt")
            .collect();
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].text, "ffff gggg");
        assert!(chunks
            .iter()
            .filter(|c| c.metadata.source == "a.txt")
            .all(|c| !c.text.contains('f')));
    }

    #[test]
    fn test_custom_separators() {
        let splitter = ChunkSplitter::new(12, 2)
            .unwrap()
            .with_separators(["|"]);
        let spans = splitter.split_text("abcde|fghij|klmno|pqrst");
        assert!(spans[0].text.ends_with('|'));
    }
}

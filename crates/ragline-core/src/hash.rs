//! Content fingerprinting.
//!
//! A document's fingerprint is the SHA-256 of its text's UTF-8 bytes,
//! rendered as 64 lowercase hex characters. Rust strings are always UTF-8,
//! so two processes hashing the same text agree byte-for-byte.

use sha2::{Digest, Sha256};

/// Hash `text` into a lowercase hex SHA-256 digest.
///
/// ```rust
/// use ragline_core::hash::content_hash;
///
/// assert_eq!(content_hash("abc"), content_hash("abc"));
/// assert_ne!(content_hash("abc"), content_hash("abd"));
/// assert_eq!(content_hash("abc").len(), 64);
/// ```
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_stable_and_distinct() {
        assert_eq!(content_hash("Hello world"), content_hash("Hello world"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_multibyte_text() {
        let h = content_hash("naïve café, 東京");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

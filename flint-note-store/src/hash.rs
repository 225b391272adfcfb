//! Content hashing (component C).

use sha2::{Digest, Sha256};

/// SHA-256 over the exact bytes that are (or will be) written to disk for
/// a note, prefixed `sha256:` so the string is self-describing.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_prefixed_and_deterministic() {
        let a = content_hash(b"hello");
        let b = content_hash(b"hello");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }
}

//! Content-addressed blob storage for artifact bytes.
//!
//! In-memory only; blobs are keyed by their own digest, so putting the
//! same bytes twice is a no-op and the store deduplicates across runs.

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// In-memory content-addressed store keyed by `sha256:<hex>`.
///
/// Thread-safe via `DashMap`; all operations are lock-free on the happy
/// path.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl BlobStore {
    /// Create a new empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes and return their content key.
    pub fn put(&self, bytes: Vec<u8>) -> String {
        let key = Self::digest(&bytes);
        self.blobs.entry(key.clone()).or_insert(bytes);
        key
    }

    /// Fetch a blob by content key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.get(key).map(|entry| entry.value().clone())
    }

    /// True when a blob with this key is stored.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    /// Number of distinct blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True when no blobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Compute the content key for a byte slice.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("sha256:{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let store = BlobStore::new();
        let key = store.put(b"model bytes".to_vec());
        assert!(key.starts_with("sha256:"));
        assert_eq!(store.get(&key), Some(b"model bytes".to_vec()));
    }

    #[test]
    fn test_identical_blobs_deduplicate() {
        let store = BlobStore::new();
        let key_a = store.put(b"same".to_vec());
        let key_b = store.put(b"same".to_vec());
        assert_eq!(key_a, key_b);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_digest_is_stable() {
        // sha256 of the empty string is a fixed vector
        assert_eq!(
            BlobStore::digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_key() {
        let store = BlobStore::new();
        assert!(store.get("sha256:nope").is_none());
        assert!(!store.contains("sha256:nope"));
        assert!(store.is_empty());
    }
}

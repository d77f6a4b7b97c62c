//! Artifact record - content-addressed run outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one stored run artifact.
///
/// The bytes themselves live in the [`BlobStore`](super::BlobStore)
/// under `sha256` (format `sha256:<hex>`), so identical blobs logged by
/// different runs share storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    run_id: String,
    path: String,
    sha256: String,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

impl ArtifactRecord {
    /// Create a new artifact record with the current timestamp.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        path: impl Into<String>,
        sha256: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            path: path.into(),
            sha256: sha256.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the artifact path (run-relative, e.g. `model.json`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the content hash (`sha256:<hex>`).
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Get the blob size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_record_new() {
        let artifact = ArtifactRecord::new("run-1", "model.json", "sha256:abc123", 1024);
        assert_eq!(artifact.run_id(), "run-1");
        assert_eq!(artifact.path(), "model.json");
        assert!(artifact.sha256().starts_with("sha256:"));
        assert_eq!(artifact.size_bytes(), 1024);
    }
}

//! Versioned model snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Stage;

/// Registration status of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionStatus {
    /// Registration requested, not yet materialized.
    Pending,
    /// Artifact registered and servable.
    Ready,
    /// Registration failed; the version number stays burned.
    Failed,
}

/// One registered, versioned snapshot of a trained artifact.
///
/// The version number is assigned once by the registry and never
/// changes. The snapshot references its source run and the artifact's
/// content hash in the tracking store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelVersion {
    model_name: String,
    version: u64,
    source_run: String,
    artifact_sha: String,
    stage: Stage,
    status: VersionStatus,
    created_at: DateTime<Utc>,
}

impl ModelVersion {
    pub(crate) fn new(
        model_name: impl Into<String>,
        version: u64,
        source_run: impl Into<String>,
        artifact_sha: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            version,
            source_run: source_run.into(),
            artifact_sha: artifact_sha.into(),
            stage: Stage::None,
            status: VersionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Get the owning model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the version number.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Get the id of the run the artifact came from.
    #[must_use]
    pub fn source_run(&self) -> &str {
        &self.source_run
    }

    /// Get the content hash of the registered artifact.
    #[must_use]
    pub fn artifact_sha(&self) -> &str {
        &self.artifact_sha
    }

    /// Get the current lifecycle stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Get the registration status.
    #[must_use]
    pub const fn status(&self) -> VersionStatus {
        self.status
    }

    /// Get the registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) -> Stage {
        std::mem::replace(&mut self.stage, stage)
    }

    pub(crate) fn set_status(&mut self, status: VersionStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_version_is_pending_unstaged() {
        let v = ModelVersion::new("wine-model", 1, "run-1", "sha256:abc");
        assert_eq!(v.version(), 1);
        assert_eq!(v.stage(), Stage::None);
        assert_eq!(v.status(), VersionStatus::Pending);
    }

    #[test]
    fn test_set_stage_returns_previous() {
        let mut v = ModelVersion::new("wine-model", 1, "run-1", "sha256:abc");
        let previous = v.set_stage(Stage::Production);
        assert_eq!(previous, Stage::None);
        assert_eq!(v.stage(), Stage::Production);
    }
}

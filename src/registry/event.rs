//! Registry event history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Stage, VersionStatus};

/// What happened to a model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new version was registered.
    VersionCreated,
    /// Registration status changed (Pending → Ready/Failed).
    StatusChanged {
        /// New status
        status: VersionStatus,
    },
    /// Stage transition, with the discarded previous stage.
    StageTransition {
        /// Stage before the transition
        from: Stage,
        /// Stage after the transition
        to: Stage,
    },
    /// A version was deleted.
    VersionDeleted,
    /// The whole model was deleted.
    ModelDeleted,
}

/// One entry in a model's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    model_name: String,
    version: Option<u64>,
    kind: EventKind,
    timestamp: DateTime<Utc>,
}

impl RegistryEvent {
    pub(crate) fn new(model_name: impl Into<String>, version: Option<u64>, kind: EventKind) -> Self {
        Self {
            model_name: model_name.into(),
            version,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Get the model name the event belongs to.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the version the event refers to (`None` for model-level events).
    #[must_use]
    pub const fn version(&self) -> Option<u64> {
        self.version
    }

    /// Get the event kind.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Get the event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

//! Model registry: named models, monotonically versioned snapshots,
//! lifecycle stages, and an event history.
//!
//! Registration is asynchronous from the caller's point of view: a new
//! version starts `Pending` and becomes `Ready` only after status polls
//! (see [`RegistryConfig`]). [`ModelRegistry::await_ready`] wraps the
//! fixed-sleep polling loop the rest of the pipeline uses.

mod event;
mod stage;
mod store;
mod version;

pub use event::{EventKind, RegistryEvent};
pub use store::{ModelRegistry, RegisteredModel, RegistryConfig};
pub use stage::Stage;
pub use version::{ModelVersion, VersionStatus};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed-sleep polling policy shared by registry and deployment waits.
///
/// No backoff: `budget` polls, `interval` apart, then a timeout error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Sleep between polls, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of polls before giving up.
    pub budget: u32,
}

impl PollPolicy {
    /// Sleep interval as a `Duration`.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            budget: 50,
        }
    }
}

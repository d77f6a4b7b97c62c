//! Model registry - versioned model storage and stage management.

use std::sync::RwLock;
use std::thread;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{EventKind, ModelVersion, PollPolicy, RegistryEvent, Stage, VersionStatus};
use crate::tracking::ArtifactRecord;
use crate::{Error, Result};

/// Registry behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RegistryConfig {
    /// Number of status polls before a Pending version turns Ready.
    ///
    /// Zero (the default) makes registration effectively synchronous:
    /// the first poll observes Ready. Tests raise this to exercise the
    /// poll-until-ready contract.
    pub ready_after_polls: u32,
    /// Fixed-sleep policy used by [`ModelRegistry::await_ready`].
    pub poll: PollPolicy,
}

/// A named model: an ordered list of versions plus a version counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisteredModel {
    name: String,
    created_at: DateTime<Utc>,
    versions: Vec<ModelVersion>,
    next_version: u64,
}

impl RegisteredModel {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            versions: Vec::new(),
            next_version: 1,
        }
    }

    /// Get the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Versions in registration order.
    #[must_use]
    pub fn versions(&self) -> &[ModelVersion] {
        &self.versions
    }

    fn version_mut(&mut self, version: u64) -> Option<&mut ModelVersion> {
        self.versions.iter_mut().find(|v| v.version() == version)
    }

    fn version_ref(&self, version: u64) -> Option<&ModelVersion> {
        self.versions.iter().find(|v| v.version() == version)
    }
}

/// Thread-safe model registry with auto-incrementing versions, stage
/// transitions, guarded deletion, and an append-only event history.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: DashMap<String, RegisteredModel>,
    /// Remaining polls before a Pending version flips Ready, keyed by
    /// `(model, version)`.
    countdowns: DashMap<(String, u64), u32>,
    events: RwLock<Vec<RegistryEvent>>,
    config: RegistryConfig,
}

impl ModelRegistry {
    /// Create a registry with default configuration (registration is
    /// Ready on first poll).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with explicit configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register a run's artifact under a model name.
    ///
    /// Creates the model on first registration. Returns the assigned
    /// version number; version numbers increase strictly per model and
    /// are never reused. The new version starts `Pending` — poll with
    /// [`poll_status`](Self::poll_status) or block with
    /// [`await_ready`](Self::await_ready).
    ///
    /// # Errors
    ///
    /// Infallible today (kept fallible for parity with a remote
    /// registry client).
    pub fn register(
        &self,
        model_name: &str,
        run_id: &str,
        artifact: &ArtifactRecord,
    ) -> Result<u64> {
        let mut model = self
            .models
            .entry(model_name.to_string())
            .or_insert_with(|| RegisteredModel::new(model_name));
        let version = model.next_version;
        model.next_version += 1;
        model.versions.push(ModelVersion::new(
            model_name,
            version,
            run_id,
            artifact.sha256(),
        ));
        drop(model);

        self.countdowns
            .insert((model_name.to_string(), version), self.config.ready_after_polls);
        self.push_event(model_name, Some(version), EventKind::VersionCreated);
        tracing::info!(model = model_name, version, run_id, "registered model version");
        Ok(version)
    }

    /// Poll the registration status of a version.
    ///
    /// Each poll of a Pending version advances its countdown; when the
    /// countdown reaches zero the version flips to Ready.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`] or [`Error::VersionNotFound`].
    pub fn poll_status(&self, model_name: &str, version: u64) -> Result<VersionStatus> {
        let mut model = self.model_mut(model_name)?;
        let entry = model
            .version_mut(version)
            .ok_or_else(|| Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            })?;

        if entry.status() == VersionStatus::Pending {
            let key = (model_name.to_string(), version);
            let remaining = self.countdowns.get(&key).map_or(0, |c| *c);
            if remaining == 0 {
                entry.set_status(VersionStatus::Ready);
                drop(model);
                self.countdowns.remove(&key);
                self.push_event(
                    model_name,
                    Some(version),
                    EventKind::StatusChanged {
                        status: VersionStatus::Ready,
                    },
                );
                return Ok(VersionStatus::Ready);
            }
            self.countdowns.insert(key, remaining - 1);
            return Ok(VersionStatus::Pending);
        }
        Ok(entry.status())
    }

    /// Mark a Pending registration as Failed (what a remote backend
    /// would do on a broken artifact).
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`] or [`Error::VersionNotFound`].
    pub fn fail_registration(&self, model_name: &str, version: u64) -> Result<()> {
        let mut model = self.model_mut(model_name)?;
        let entry = model
            .version_mut(version)
            .ok_or_else(|| Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            })?;
        entry.set_status(VersionStatus::Failed);
        drop(model);
        self.countdowns.remove(&(model_name.to_string(), version));
        self.push_event(
            model_name,
            Some(version),
            EventKind::StatusChanged {
                status: VersionStatus::Failed,
            },
        );
        Ok(())
    }

    /// Block until a version is Ready, polling with a fixed sleep.
    ///
    /// # Errors
    ///
    /// [`Error::RegistrationFailed`] when the version turns Failed,
    /// [`Error::RegistrationTimeout`] when the polling budget runs out,
    /// plus the lookup errors of [`poll_status`](Self::poll_status).
    pub fn await_ready(&self, model_name: &str, version: u64) -> Result<()> {
        let policy = self.config.poll;
        for poll in 0..policy.budget {
            match self.poll_status(model_name, version)? {
                VersionStatus::Ready => {
                    tracing::debug!(model = model_name, version, polls = poll + 1, "version ready");
                    return Ok(());
                }
                VersionStatus::Failed => {
                    return Err(Error::RegistrationFailed {
                        model: model_name.to_string(),
                        version,
                    })
                }
                VersionStatus::Pending => thread::sleep(policy.interval()),
            }
        }
        Err(Error::RegistrationTimeout {
            model: model_name.to_string(),
            version,
            polls: policy.budget,
        })
    }

    /// Transition a version to a target stage, returning the previous
    /// stage. The previous stage is discarded, never merged.
    ///
    /// With `archive_existing`, other versions currently holding the
    /// target stage are demoted to Archived first; without it (the
    /// default) they are left untouched.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`] or [`Error::VersionNotFound`].
    pub fn transition_stage(
        &self,
        model_name: &str,
        version: u64,
        target: Stage,
        archive_existing: bool,
    ) -> Result<Stage> {
        let mut model = self.model_mut(model_name)?;
        if model.version_ref(version).is_none() {
            return Err(Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            });
        }

        let mut demoted = Vec::new();
        if archive_existing && target.is_active() {
            for other in &mut model.versions {
                if other.version() != version && other.stage() == target {
                    other.set_stage(Stage::Archived);
                    demoted.push((other.version(), target));
                }
            }
        }

        let Some(entry) = model.version_mut(version) else {
            return Err(Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            });
        };
        let previous = entry.set_stage(target);
        drop(model);

        for (demoted_version, from) in demoted {
            self.push_event(
                model_name,
                Some(demoted_version),
                EventKind::StageTransition {
                    from,
                    to: Stage::Archived,
                },
            );
        }
        self.push_event(
            model_name,
            Some(version),
            EventKind::StageTransition {
                from: previous,
                to: target,
            },
        );
        tracing::info!(
            model = model_name,
            version,
            from = %previous,
            to = %target,
            "stage transition"
        );
        Ok(previous)
    }

    /// Highest-numbered version currently in a stage, if any.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`].
    pub fn latest_by_stage(&self, model_name: &str, stage: Stage) -> Result<Option<ModelVersion>> {
        let model = self.model_ref(model_name)?;
        Ok(model
            .versions()
            .iter()
            .filter(|v| v.stage() == stage)
            .max_by_key(|v| v.version())
            .cloned())
    }

    /// Get a model snapshot by name.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`].
    pub fn get_model(&self, model_name: &str) -> Result<RegisteredModel> {
        Ok(self.model_ref(model_name)?.clone())
    }

    /// Get one version of a model.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`] or [`Error::VersionNotFound`].
    pub fn get_version(&self, model_name: &str, version: u64) -> Result<ModelVersion> {
        let model = self.model_ref(model_name)?;
        model
            .version_ref(version)
            .cloned()
            .ok_or_else(|| Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            })
    }

    /// Delete one version. Rejected while the version is in Staging or
    /// Production.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`], [`Error::VersionNotFound`], or
    /// [`Error::DeleteBlocked`].
    pub fn delete_version(&self, model_name: &str, version: u64) -> Result<()> {
        let mut model = self.model_mut(model_name)?;
        let entry = model
            .version_ref(version)
            .ok_or_else(|| Error::VersionNotFound {
                model: model_name.to_string(),
                version,
            })?;
        if entry.stage().is_active() {
            return Err(Error::DeleteBlocked {
                model: model_name.to_string(),
                active: 1,
            });
        }
        model.versions.retain(|v| v.version() != version);
        drop(model);
        self.countdowns.remove(&(model_name.to_string(), version));
        self.push_event(model_name, Some(version), EventKind::VersionDeleted);
        Ok(())
    }

    /// Delete a model and all its versions. Rejected while any version
    /// is in Staging or Production.
    ///
    /// # Errors
    ///
    /// [`Error::ModelNotFound`] or [`Error::DeleteBlocked`].
    pub fn delete_model(&self, model_name: &str) -> Result<()> {
        let active = {
            let model = self.model_ref(model_name)?;
            model
                .versions()
                .iter()
                .filter(|v| v.stage().is_active())
                .count()
        };
        if active > 0 {
            return Err(Error::DeleteBlocked {
                model: model_name.to_string(),
                active,
            });
        }
        self.models.remove(model_name);
        self.countdowns.retain(|(name, _), _| name != model_name);
        self.push_event(model_name, None, EventKind::ModelDeleted);
        tracing::info!(model = model_name, "deleted model");
        Ok(())
    }

    /// Event history for a model, oldest first.
    #[must_use]
    pub fn events_for_model(&self, model_name: &str) -> Vec<RegistryEvent> {
        self.events
            .read()
            .expect("events lock poisoned")
            .iter()
            .filter(|e| e.model_name() == model_name)
            .cloned()
            .collect()
    }

    /// Number of registered models.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    fn model_ref(
        &self,
        model_name: &str,
    ) -> Result<dashmap::mapref::one::Ref<'_, String, RegisteredModel>> {
        self.models
            .get(model_name)
            .ok_or_else(|| Error::ModelNotFound(model_name.to_string()))
    }

    fn model_mut(
        &self,
        model_name: &str,
    ) -> Result<dashmap::mapref::one::RefMut<'_, String, RegisteredModel>> {
        self.models
            .get_mut(model_name)
            .ok_or_else(|| Error::ModelNotFound(model_name.to_string()))
    }

    fn push_event(&self, model_name: &str, version: Option<u64>, kind: EventKind) {
        self.events
            .write()
            .expect("events lock poisoned")
            .push(RegistryEvent::new(model_name, version, kind));
    }
}

//! Tracking store - shared storage for the run recorder.

use std::sync::RwLock;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use super::{
    ArtifactRecord, BlobStore, ExperimentRecord, MetricRecord, ParamRecord, ParamValue, RunRecord,
    RunStatus,
};
use crate::{Error, Result};

/// Shared store for experiments, runs, and their logged data.
///
/// Maps are `DashMap`s and the record tables are append-only vectors
/// behind `RwLock`s, so concurrent runs under the same experiment can
/// log independently with `&self` receivers.
///
/// ## Immutability
///
/// Params, metrics, and artifacts can only be appended while the run is
/// open. `end_run` finalizes the run; every mutation after that fails
/// with [`Error::RunFinalized`]. Re-logging a param key with a different
/// value fails even on an open run.
#[derive(Debug, Default)]
pub struct TrackingStore {
    experiments: DashMap<String, ExperimentRecord>,
    runs: DashMap<String, RunRecord>,
    params: RwLock<Vec<ParamRecord>>,
    metrics: RwLock<Vec<MetricRecord>>,
    artifacts: RwLock<Vec<ArtifactRecord>>,
    blobs: BlobStore,
}

impl TrackingStore {
    /// Create a new empty tracking store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an experiment and return its generated id.
    pub fn create_experiment(&self, name: impl Into<String>) -> String {
        let experiment_id = Uuid::new_v4().to_string();
        let record = ExperimentRecord::new(experiment_id.clone(), name);
        tracing::info!(experiment_id, name = record.name(), "created experiment");
        self.experiments.insert(experiment_id.clone(), record);
        experiment_id
    }

    /// Start a run under an experiment and return its generated id.
    ///
    /// The run begins in `Running` status with `started_at` stamped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] for an unknown experiment.
    pub fn begin_run(&self, experiment_id: &str, name: impl Into<String>) -> Result<String> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(Error::ExperimentNotFound(experiment_id.to_string()));
        }
        let run_id = Uuid::new_v4().to_string();
        let mut run = RunRecord::new(run_id.clone(), experiment_id, name);
        run.start();
        tracing::info!(run_id, experiment_id, name = run.name(), "started run");
        self.runs.insert(run_id.clone(), run);
        Ok(run_id)
    }

    /// Log an input parameter on an open run.
    ///
    /// Logging the same key with the same value again is a no-op.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`], [`Error::RunFinalized`], or
    /// [`Error::ParamRewrite`] when the key was already logged with a
    /// different value.
    pub fn log_param(
        &self,
        run_id: &str,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Result<()> {
        self.ensure_open(run_id)?;
        let key = key.into();
        let value = value.into();

        let mut params = self.params.write().expect("params lock poisoned");
        if let Some(existing) = params
            .iter()
            .find(|p| p.run_id() == run_id && p.key() == key)
        {
            if existing.value() == &value {
                return Ok(());
            }
            return Err(Error::ParamRewrite {
                run_id: run_id.to_string(),
                key,
            });
        }
        tracing::debug!(run_id, key, %value, "logged param");
        params.push(ParamRecord::new(run_id, key, value));
        Ok(())
    }

    /// Log a metric data point on an open run.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`] or [`Error::RunFinalized`].
    pub fn log_metric(
        &self,
        run_id: &str,
        key: impl Into<String>,
        step: u64,
        value: f64,
    ) -> Result<()> {
        self.ensure_open(run_id)?;
        let key = key.into();
        tracing::debug!(run_id, key, step, value, "logged metric");
        self.metrics
            .write()
            .expect("metrics lock poisoned")
            .push(MetricRecord::new(run_id, key, step, value));
        Ok(())
    }

    /// Store artifact bytes for an open run under a run-relative path.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`] or [`Error::RunFinalized`].
    pub fn log_artifact(
        &self,
        run_id: &str,
        path: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<ArtifactRecord> {
        self.ensure_open(run_id)?;
        let path = path.into();
        let size_bytes = bytes.len() as u64;
        let sha = self.blobs.put(bytes);
        let record = ArtifactRecord::new(run_id, path, sha, size_bytes);
        tracing::debug!(
            run_id,
            path = record.path(),
            sha = record.sha256(),
            size_bytes,
            "logged artifact"
        );
        self.artifacts
            .write()
            .expect("artifacts lock poisoned")
            .push(record.clone());
        Ok(record)
    }

    /// Finalize a run with a terminal status.
    ///
    /// # Errors
    ///
    /// [`Error::RunNotFound`], or [`Error::RunFinalized`] when the run
    /// was already ended.
    pub fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        if !run.is_open() {
            return Err(Error::RunFinalized(run_id.to_string()));
        }
        run.finish(status);
        tracing::info!(run_id, ?status, "finalized run");
        Ok(())
    }

    /// Get an experiment by id.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<ExperimentRecord> {
        self.experiments
            .get(experiment_id)
            .map(|e| e.value().clone())
    }

    /// Get a run by id.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|r| r.value().clone())
    }

    /// All runs under an experiment.
    #[must_use]
    pub fn runs_for_experiment(&self, experiment_id: &str) -> Vec<RunRecord> {
        self.runs
            .iter()
            .filter(|entry| entry.value().experiment_id() == experiment_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The exact parameter set logged for a run.
    #[must_use]
    pub fn params_for_run(&self, run_id: &str) -> FxHashMap<String, ParamValue> {
        self.params
            .read()
            .expect("params lock poisoned")
            .iter()
            .filter(|p| p.run_id() == run_id)
            .map(|p| (p.key().to_string(), p.value().clone()))
            .collect()
    }

    /// Metric series for `(run, key)`, ordered by step.
    #[must_use]
    pub fn metric_history(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut series: Vec<MetricRecord> = self
            .metrics
            .read()
            .expect("metrics lock poisoned")
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();
        series.sort_by_key(MetricRecord::step);
        series
    }

    /// Latest value (highest step) of a metric, if logged.
    #[must_use]
    pub fn latest_metric(&self, run_id: &str, key: &str) -> Option<f64> {
        self.metric_history(run_id, key)
            .last()
            .map(MetricRecord::value)
    }

    /// All artifact records for a run, in log order.
    #[must_use]
    pub fn artifacts_for_run(&self, run_id: &str) -> Vec<ArtifactRecord> {
        self.artifacts
            .read()
            .expect("artifacts lock poisoned")
            .iter()
            .filter(|a| a.run_id() == run_id)
            .cloned()
            .collect()
    }

    /// Look up an artifact record by run and path (latest wins).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactNotFound`] when no artifact was logged
    /// under the path.
    pub fn artifact(&self, run_id: &str, path: &str) -> Result<ArtifactRecord> {
        self.artifacts
            .read()
            .expect("artifacts lock poisoned")
            .iter()
            .rev()
            .find(|a| a.run_id() == run_id && a.path() == path)
            .cloned()
            .ok_or_else(|| Error::ArtifactNotFound(format!("{run_id}/{path}")))
    }

    /// Fetch the bytes behind an artifact record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactNotFound`] when the blob is missing.
    pub fn artifact_bytes(&self, record: &ArtifactRecord) -> Result<Vec<u8>> {
        self.blobs
            .get(record.sha256())
            .ok_or_else(|| Error::ArtifactNotFound(record.sha256().to_string()))
    }

    /// Number of experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    fn ensure_open(&self, run_id: &str) -> Result<()> {
        let run = self
            .runs
            .get(run_id)
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))?;
        if run.is_open() {
            Ok(())
        } else {
            Err(Error::RunFinalized(run_id.to_string()))
        }
    }
}

//! Error types for mlrail
//!
//! One enum for the whole crate, with a `Result` alias. Platform-style
//! failures (registration timeout, blocked deletion, failed builds) get
//! their own variants so callers can match on them; everything from the
//! underlying libraries is wrapped via `#[from]`.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mlrail error types
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset file does not exist
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// Dataset is present but malformed (missing target column, non-numeric cell, empty table)
    #[error("dataset error: {0}")]
    Dataset(String),

    /// No experiment with this id
    #[error("experiment not found: {0}")]
    ExperimentNotFound(String),

    /// No run with this id
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// Run was already finalized; its params/metrics/artifacts are immutable
    #[error("run {0} is finalized and can no longer be modified")]
    RunFinalized(String),

    /// A parameter key was re-logged with a different value
    #[error("parameter {key:?} already logged for run {run_id} with a different value")]
    ParamRewrite {
        /// Run the parameter belongs to
        run_id: String,
        /// Offending parameter key
        key: String,
    },

    /// No registered model with this name
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Model exists but has no such version
    #[error("model {model} has no version {version}")]
    VersionNotFound {
        /// Registered model name
        model: String,
        /// Requested version number
        version: u64,
    },

    /// No artifact at this path for the run
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Deletion rejected while versions remain in Staging/Production
    #[error("cannot delete {model}: {active} version(s) still in Staging or Production")]
    DeleteBlocked {
        /// Registered model name
        model: String,
        /// Number of versions still active
        active: usize,
    },

    /// Polling budget exhausted before the version became Ready
    #[error("registration of {model} v{version} still pending after {polls} polls")]
    RegistrationTimeout {
        /// Registered model name
        model: String,
        /// Version that never became Ready
        version: u64,
        /// Number of polls performed
        polls: u32,
    },

    /// Registration completed with Failed status
    #[error("registration of {model} v{version} failed")]
    RegistrationFailed {
        /// Registered model name
        model: String,
        /// Version that failed to register
        version: u64,
    },

    /// Image build reported Failed
    #[error("image build failed: {0}")]
    BuildFailed(String),

    /// Polling budget exhausted before the image build finished
    #[error("image build {image_id} still running after {polls} polls")]
    BuildTimedOut {
        /// Opaque image handle id
        image_id: String,
        /// Number of polls performed
        polls: u32,
    },

    /// No image with this id at the deployment backend
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// No served endpoint with this name
    #[error("endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Stage string outside {None, Staging, Production, Archived}
    #[error("invalid stage: {0:?}")]
    InvalidStage(String),

    /// Scoring payload does not match the deployed model
    #[error("scoring error: {0}")]
    Scoring(String),

    /// Packaging manifest is invalid (bad pin, unknown entry point, missing parameter)
    #[error("manifest error: {0}")]
    Manifest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

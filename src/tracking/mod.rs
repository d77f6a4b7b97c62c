//! Run recording: experiments, runs, params, metrics, artifacts.
//!
//! ## Schema
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< ParamRecord (N)    [append-only]
//!                              ├──< MetricRecord (N)   [time-series]
//!                              └──< ArtifactRecord (N) [content-addressed]
//! ```
//!
//! A run is open between `begin_run` and `end_run`; while open, params,
//! metrics, and artifacts may be appended but never rewritten. After
//! `end_run` the run is immutable.

mod artifact;
mod blob;
mod experiment;
mod metric;
mod param;
mod run;
mod store;

pub use artifact::ArtifactRecord;
pub use blob::BlobStore;
pub use experiment::ExperimentRecord;
pub use metric::MetricRecord;
pub use param::{ParamRecord, ParamValue};
pub use run::{RunRecord, RunStatus};
pub use store::TrackingStore;

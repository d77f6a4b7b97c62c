//! # mlrail: Embedded Model Lifecycle Rail
//!
//! mlrail packs the standard model lifecycle pipeline — train, record
//! the run, register the artifact, build, deploy, score — into a single
//! embeddable crate with no external services.
//!
//! ## Pipeline
//!
//! ```text
//! dataset ──> train ──> tracking (run) ──> registry (version) ──> deploy (endpoint)
//!                                                                      │
//!                                              serve (HTTP scoring) <──┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use mlrail::registry::{ModelRegistry, Stage};
//! use mlrail::tracking::{RunStatus, TrackingStore};
//!
//! # fn main() -> mlrail::Result<()> {
//! let store = TrackingStore::new();
//! let exp = store.create_experiment("wine-quality");
//! let run = store.begin_run(&exp, "elasticnet-baseline")?;
//!
//! store.log_param(&run, "alpha", 0.75)?;
//! store.log_metric(&run, "rmse", 0, 0.79)?;
//! let artifact = store.log_artifact(&run, "model.json", b"{}".to_vec())?;
//! store.end_run(&run, RunStatus::Finished)?;
//!
//! let registry = ModelRegistry::new();
//! let version = registry.register("wine-model", &run, &artifact)?;
//! registry.await_ready("wine-model", version)?;
//! registry.transition_stage("wine-model", version, Stage::Staging, false)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod dataset;
pub mod deploy;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod registry;
pub mod serve;
pub mod tracking;
pub mod train;

pub use error::{Error, Result};

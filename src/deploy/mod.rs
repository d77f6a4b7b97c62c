//! Deployment driver: package a registered model into a servable image
//! and expose it behind an endpoint.
//!
//! The external platform (container builds, cluster orchestration) sits
//! behind the [`DeploymentBackend`] trait; the crate ships only the
//! in-process [`LocalBackend`]. The [`DeploymentDriver`] adds the
//! fixed-sleep polling glue: request a build, poll until terminal,
//! deploy to a target, update in place, tear down.

mod backend;
mod driver;
mod local;

pub use backend::DeploymentBackend;
pub use driver::DeploymentDriver;
pub use local::{LocalBackend, LocalBackendConfig};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deployment target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Development target: no access credential.
    Dev,
    /// Production target: endpoint gets a bearer credential.
    Prod,
}

impl Target {
    /// Lowercase form used in endpoint names and URIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal-or-not state of an image build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    /// Build still in progress; keep polling.
    Building,
    /// Image is ready to deploy.
    Succeeded,
    /// Build failed; the image is unusable.
    Failed,
}

/// Opaque handle to a (possibly still building) servable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    image_id: String,
    model_name: String,
    version: u64,
    status: BuildStatus,
}

impl ImageHandle {
    pub(crate) fn new(
        image_id: impl Into<String>,
        model_name: impl Into<String>,
        version: u64,
        status: BuildStatus,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            model_name: model_name.into(),
            version,
            status,
        }
    }

    /// Get the opaque image id.
    #[must_use]
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Get the packaged model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the packaged model version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Build status at the time the handle was issued or last polled.
    #[must_use]
    pub const fn status(&self) -> BuildStatus {
        self.status
    }
}

/// A served endpoint: a deployed image reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    name: String,
    scoring_uri: String,
    auth_key: Option<String>,
    image_id: String,
    model_name: String,
    version: u64,
    target: Target,
}

impl Endpoint {
    pub(crate) fn new(
        name: impl Into<String>,
        scoring_uri: impl Into<String>,
        auth_key: Option<String>,
        image: &ImageHandle,
        target: Target,
    ) -> Self {
        Self {
            name: name.into(),
            scoring_uri: scoring_uri.into(),
            auth_key,
            image_id: image.image_id().to_string(),
            model_name: image.model_name().to_string(),
            version: image.version(),
            target,
        }
    }

    /// Get the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the scoring URI.
    #[must_use]
    pub fn scoring_uri(&self) -> &str {
        &self.scoring_uri
    }

    /// Get the bearer credential, if the target issues one.
    #[must_use]
    pub fn auth_key(&self) -> Option<&str> {
        self.auth_key.as_deref()
    }

    /// Get the id of the image currently served.
    #[must_use]
    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    /// Get the served model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Get the served model version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Get the deployment target.
    #[must_use]
    pub const fn target(&self) -> Target {
        self.target
    }
}

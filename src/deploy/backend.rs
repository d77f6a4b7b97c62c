//! Seam between the deployment driver and the hosting platform.

use super::{BuildStatus, Endpoint, ImageHandle, Target};
use crate::Result;

/// The operations a hosting platform must provide.
///
/// A real implementation would talk to a container build service and an
/// orchestrator; [`LocalBackend`](super::LocalBackend) keeps everything
/// in process. Builds may be asynchronous: `start_build` can return a
/// `Building` handle that callers poll via `build_status`.
pub trait DeploymentBackend {
    /// Request an image build for a model version's serialized payload.
    ///
    /// # Errors
    ///
    /// Backend-specific; the local backend is infallible here.
    fn start_build(&self, model_name: &str, version: u64, payload: Vec<u8>)
        -> Result<ImageHandle>;

    /// Poll the status of a build.
    ///
    /// # Errors
    ///
    /// Returns an error when the image id is unknown.
    fn build_status(&self, image_id: &str) -> Result<BuildStatus>;

    /// Expose a successfully built image behind a named endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the image is unknown or not built.
    fn deploy(&self, image_id: &str, target: Target, endpoint_name: &str) -> Result<Endpoint>;

    /// Replace the image served by an existing endpoint, in place.
    ///
    /// The endpoint keeps its name, URI, and credential.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint or image is unknown, or the
    /// image is not built.
    fn update(&self, endpoint_name: &str, image_id: &str) -> Result<Endpoint>;

    /// Tear down an endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint is unknown.
    fn delete(&self, endpoint_name: &str) -> Result<()>;
}

impl<B: DeploymentBackend + ?Sized> DeploymentBackend for std::sync::Arc<B> {
    fn start_build(
        &self,
        model_name: &str,
        version: u64,
        payload: Vec<u8>,
    ) -> Result<ImageHandle> {
        (**self).start_build(model_name, version, payload)
    }

    fn build_status(&self, image_id: &str) -> Result<BuildStatus> {
        (**self).build_status(image_id)
    }

    fn deploy(&self, image_id: &str, target: Target, endpoint_name: &str) -> Result<Endpoint> {
        (**self).deploy(image_id, target, endpoint_name)
    }

    fn update(&self, endpoint_name: &str, image_id: &str) -> Result<Endpoint> {
        (**self).update(endpoint_name, image_id)
    }

    fn delete(&self, endpoint_name: &str) -> Result<()> {
        (**self).delete(endpoint_name)
    }
}

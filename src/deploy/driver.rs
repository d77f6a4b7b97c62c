//! Polling glue between the pipeline and a deployment backend.

use std::thread;

use super::{BuildStatus, DeploymentBackend, Endpoint, ImageHandle, Target};
use crate::registry::{ModelVersion, PollPolicy};
use crate::{Error, Result};

/// Drives a [`DeploymentBackend`] with the crate's fixed-sleep polling
/// convention: no backoff, a fixed interval, a fixed budget.
#[derive(Debug)]
pub struct DeploymentDriver<B> {
    backend: B,
    poll: PollPolicy,
}

impl<B: DeploymentBackend> DeploymentDriver<B> {
    /// Wrap a backend with the default polling policy.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            poll: PollPolicy::default(),
        }
    }

    /// Wrap a backend with an explicit polling policy.
    pub fn with_poll_policy(backend: B, poll: PollPolicy) -> Self {
        Self { backend, poll }
    }

    /// Borrow the wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Request an image build for a registered model version.
    ///
    /// `payload` is the serialized model artifact the version points at.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn build_image(&self, version: &ModelVersion, payload: Vec<u8>) -> Result<ImageHandle> {
        self.backend
            .start_build(version.model_name(), version.version(), payload)
    }

    /// Poll a build until it is terminal.
    ///
    /// # Errors
    ///
    /// [`Error::BuildFailed`] when the build ends Failed,
    /// [`Error::BuildTimedOut`] when the polling budget runs out, plus
    /// backend lookup errors.
    pub fn wait_for_image(&self, image: &ImageHandle) -> Result<()> {
        for poll in 0..self.poll.budget {
            match self.backend.build_status(image.image_id())? {
                BuildStatus::Succeeded => {
                    tracing::debug!(
                        image_id = image.image_id(),
                        polls = poll + 1,
                        "image build finished"
                    );
                    return Ok(());
                }
                BuildStatus::Failed => {
                    return Err(Error::BuildFailed(image.image_id().to_string()))
                }
                BuildStatus::Building => thread::sleep(self.poll.interval()),
            }
        }
        Err(Error::BuildTimedOut {
            image_id: image.image_id().to_string(),
            polls: self.poll.budget,
        })
    }

    /// Deploy a built image to a target.
    ///
    /// The endpoint is named `<model>-<target>`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors (unknown or unbuilt image).
    pub fn deploy(&self, image: &ImageHandle, target: Target) -> Result<Endpoint> {
        let endpoint_name = format!("{}-{}", image.model_name(), target);
        self.backend
            .deploy(image.image_id(), target, &endpoint_name)
    }

    /// Replace the image served by an endpoint, in place.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn update(&self, endpoint: &Endpoint, image: &ImageHandle) -> Result<Endpoint> {
        self.backend.update(endpoint.name(), image.image_id())
    }

    /// Tear down an endpoint.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn delete(&self, endpoint: &Endpoint) -> Result<()> {
        self.backend.delete(endpoint.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::deploy::{LocalBackend, LocalBackendConfig};
    use crate::train::{fit, TrainConfig};

    fn version() -> ModelVersion {
        ModelVersion::new("wine-model", 1, "run-1", "sha256:abc")
    }

    fn payload() -> Vec<u8> {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let target: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        let ds = Dataset::from_parts(vec!["x".to_string()], "y", rows, target).unwrap();
        fit(&ds, &TrainConfig::default())
            .unwrap()
            .to_artifact_bytes()
            .unwrap()
    }

    fn fast_poll(budget: u32) -> PollPolicy {
        PollPolicy {
            interval_ms: 0,
            budget,
        }
    }

    #[test]
    fn test_build_then_deploy_to_dev() {
        let driver = DeploymentDriver::with_poll_policy(LocalBackend::new(), fast_poll(5));
        let image = driver.build_image(&version(), payload()).unwrap();
        driver.wait_for_image(&image).unwrap();

        let endpoint = driver.deploy(&image, Target::Dev).unwrap();
        assert_eq!(endpoint.name(), "wine-model-dev");
        assert!(endpoint.auth_key().is_none());
    }

    #[test]
    fn test_wait_times_out_on_slow_build() {
        let backend = LocalBackend::with_config(LocalBackendConfig {
            ready_after_polls: 10,
        });
        let driver = DeploymentDriver::with_poll_policy(backend, fast_poll(3));
        let image = driver.build_image(&version(), payload()).unwrap();
        let err = driver.wait_for_image(&image).unwrap_err();
        assert!(matches!(err, Error::BuildTimedOut { polls: 3, .. }));
    }

    #[test]
    fn test_wait_surfaces_failed_build() {
        let driver = DeploymentDriver::with_poll_policy(LocalBackend::new(), fast_poll(5));
        let image = driver
            .build_image(&version(), b"garbage".to_vec())
            .unwrap();
        let err = driver.wait_for_image(&image).unwrap_err();
        assert!(matches!(err, Error::BuildFailed(_)));
    }

    #[test]
    fn test_update_and_delete_round_trip() {
        let driver = DeploymentDriver::with_poll_policy(LocalBackend::new(), fast_poll(5));
        let image = driver.build_image(&version(), payload()).unwrap();
        driver.wait_for_image(&image).unwrap();
        let endpoint = driver.deploy(&image, Target::Prod).unwrap();

        let replacement = driver.build_image(&version(), payload()).unwrap();
        driver.wait_for_image(&replacement).unwrap();
        let updated = driver.update(&endpoint, &replacement).unwrap();
        assert_eq!(updated.image_id(), replacement.image_id());

        driver.delete(&updated).unwrap();
        assert!(driver.backend().endpoint("wine-model-prod").is_err());
    }
}

//! In-process deployment backend.
//!
//! Holds image payloads (serialized [`FittedModel`] JSON) and the
//! endpoint table in memory, and can score record batches against a
//! deployed endpoint. Build asynchrony is modelled the same way the
//! registry models registration: a build turns terminal only after a
//! configurable number of status polls.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BuildStatus, DeploymentBackend, Endpoint, ImageHandle, Target};
use crate::train::FittedModel;
use crate::{Error, Result};

/// Local backend behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalBackendConfig {
    /// Number of status polls before a build turns terminal.
    ///
    /// Zero (the default) makes builds effectively synchronous.
    pub ready_after_polls: u32,
}

#[derive(Debug)]
struct ImageState {
    model_name: String,
    version: u64,
    payload: Vec<u8>,
    /// Terminal status the build will reach; Failed when the payload is
    /// not a deserializable model.
    outcome: BuildStatus,
    remaining_polls: u32,
    status: BuildStatus,
}

/// In-process implementation of [`DeploymentBackend`].
#[derive(Debug, Default)]
pub struct LocalBackend {
    images: DashMap<String, ImageState>,
    endpoints: DashMap<String, Endpoint>,
    config: LocalBackendConfig,
}

impl LocalBackend {
    /// Create a backend with default configuration (builds terminal on
    /// first poll).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with explicit configuration.
    #[must_use]
    pub fn with_config(config: LocalBackendConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Look up a served endpoint by name.
    ///
    /// # Errors
    ///
    /// [`Error::EndpointNotFound`].
    pub fn endpoint(&self, endpoint_name: &str) -> Result<Endpoint> {
        self.endpoints
            .get(endpoint_name)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::EndpointNotFound(endpoint_name.to_string()))
    }

    /// Names of all live endpoints.
    #[must_use]
    pub fn endpoint_names(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.key().clone()).collect()
    }

    /// Score a batch of named feature rows against a served endpoint.
    ///
    /// `columns` names the features in row order. Rows are reordered to
    /// the served model's feature order before prediction, so callers
    /// may send columns in any order as long as the names match.
    ///
    /// # Errors
    ///
    /// [`Error::EndpointNotFound`], [`Error::ImageNotFound`] when the
    /// served image vanished, or [`Error::Scoring`] when the columns do
    /// not match the model's feature set or a row is ragged.
    pub fn score(
        &self,
        endpoint_name: &str,
        columns: &[String],
        rows: &[Vec<f64>],
    ) -> Result<Vec<f64>> {
        let endpoint = self.endpoint(endpoint_name)?;
        let payload = self
            .images
            .get(endpoint.image_id())
            .map(|img| img.payload.clone())
            .ok_or_else(|| Error::ImageNotFound(endpoint.image_id().to_string()))?;
        let model = FittedModel::from_artifact_bytes(&payload)
            .map_err(|e| Error::Scoring(format!("served payload is not a model: {e}")))?;

        let order = column_order(model.feature_names(), columns)?;
        let mut reordered = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != columns.len() {
                return Err(Error::Scoring(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            reordered.push(order.iter().map(|&i| row[i]).collect());
        }
        model.predict(&reordered)
    }

    fn handle(&self, image_id: &str, state: &ImageState) -> ImageHandle {
        ImageHandle::new(image_id, state.model_name.clone(), state.version, state.status)
    }
}

/// For each model feature, the index of the request column carrying it.
fn column_order(feature_names: &[String], columns: &[String]) -> Result<Vec<usize>> {
    if columns.len() != feature_names.len() {
        return Err(Error::Scoring(format!(
            "expected {} columns {feature_names:?}, got {}",
            feature_names.len(),
            columns.len()
        )));
    }
    feature_names
        .iter()
        .map(|name| {
            columns.iter().position(|c| c == name).ok_or_else(|| {
                Error::Scoring(format!(
                    "missing column {name:?}; the model expects {feature_names:?}"
                ))
            })
        })
        .collect()
}

impl DeploymentBackend for LocalBackend {
    fn start_build(
        &self,
        model_name: &str,
        version: u64,
        payload: Vec<u8>,
    ) -> Result<ImageHandle> {
        let image_id = format!("img-{}", Uuid::new_v4());
        // A payload that does not deserialize can never serve; the build
        // ends Failed once it goes terminal.
        let outcome = if FittedModel::from_artifact_bytes(&payload).is_ok() {
            BuildStatus::Succeeded
        } else {
            BuildStatus::Failed
        };
        let state = ImageState {
            model_name: model_name.to_string(),
            version,
            payload,
            outcome,
            remaining_polls: self.config.ready_after_polls,
            status: BuildStatus::Building,
        };
        let handle = self.handle(&image_id, &state);
        tracing::info!(image_id, model = model_name, version, "started image build");
        self.images.insert(image_id, state);
        Ok(handle)
    }

    fn build_status(&self, image_id: &str) -> Result<BuildStatus> {
        let mut state = self
            .images
            .get_mut(image_id)
            .ok_or_else(|| Error::ImageNotFound(image_id.to_string()))?;
        if state.status == BuildStatus::Building {
            if state.remaining_polls == 0 {
                state.status = state.outcome;
                tracing::debug!(image_id, status = ?state.status, "build went terminal");
            } else {
                state.remaining_polls -= 1;
            }
        }
        Ok(state.status)
    }

    fn deploy(&self, image_id: &str, target: Target, endpoint_name: &str) -> Result<Endpoint> {
        let handle = {
            let state = self
                .images
                .get(image_id)
                .ok_or_else(|| Error::ImageNotFound(image_id.to_string()))?;
            if state.status != BuildStatus::Succeeded {
                return Err(Error::BuildFailed(format!(
                    "image {image_id} is not built (status {:?})",
                    state.status
                )));
            }
            self.handle(image_id, &state)
        };

        let auth_key = match target {
            Target::Prod => Some(Uuid::new_v4().simple().to_string()),
            Target::Dev => None,
        };
        let scoring_uri = format!("http://127.0.0.1:8080/invocations/{endpoint_name}");
        let endpoint = Endpoint::new(endpoint_name, scoring_uri, auth_key, &handle, target);
        tracing::info!(
            endpoint = endpoint_name,
            image_id,
            %target,
            uri = endpoint.scoring_uri(),
            "deployed endpoint"
        );
        self.endpoints
            .insert(endpoint_name.to_string(), endpoint.clone());
        Ok(endpoint)
    }

    fn update(&self, endpoint_name: &str, image_id: &str) -> Result<Endpoint> {
        let handle = {
            let state = self
                .images
                .get(image_id)
                .ok_or_else(|| Error::ImageNotFound(image_id.to_string()))?;
            if state.status != BuildStatus::Succeeded {
                return Err(Error::BuildFailed(format!(
                    "image {image_id} is not built (status {:?})",
                    state.status
                )));
            }
            self.handle(image_id, &state)
        };

        let mut endpoint = self
            .endpoints
            .get_mut(endpoint_name)
            .ok_or_else(|| Error::EndpointNotFound(endpoint_name.to_string()))?;
        let updated = Endpoint::new(
            endpoint.name(),
            endpoint.scoring_uri(),
            endpoint.auth_key().map(str::to_string),
            &handle,
            endpoint.target(),
        );
        *endpoint = updated.clone();
        tracing::info!(endpoint = endpoint_name, image_id, "updated endpoint in place");
        Ok(updated)
    }

    fn delete(&self, endpoint_name: &str) -> Result<()> {
        self.endpoints
            .remove(endpoint_name)
            .ok_or_else(|| Error::EndpointNotFound(endpoint_name.to_string()))?;
        tracing::info!(endpoint = endpoint_name, "deleted endpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::train::{fit, TrainConfig};

    fn model_payload() -> Vec<u8> {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let target: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] + 1.0).collect();
        let ds = Dataset::from_parts(vec!["x".to_string()], "y", rows, target).unwrap();
        fit(&ds, &TrainConfig::default())
            .unwrap()
            .to_artifact_bytes()
            .unwrap()
    }

    #[test]
    fn test_build_succeeds_immediately_by_default() {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        assert_eq!(handle.status(), BuildStatus::Building);
        assert_eq!(
            backend.build_status(handle.image_id()).unwrap(),
            BuildStatus::Succeeded
        );
    }

    #[test]
    fn test_build_stays_building_for_configured_polls() {
        let backend = LocalBackend::with_config(LocalBackendConfig {
            ready_after_polls: 2,
        });
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        let id = handle.image_id();
        assert_eq!(backend.build_status(id).unwrap(), BuildStatus::Building);
        assert_eq!(backend.build_status(id).unwrap(), BuildStatus::Building);
        assert_eq!(backend.build_status(id).unwrap(), BuildStatus::Succeeded);
    }

    #[test]
    fn test_garbage_payload_fails_build() {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, b"not json".to_vec()).unwrap();
        assert_eq!(
            backend.build_status(handle.image_id()).unwrap(),
            BuildStatus::Failed
        );
    }

    #[test]
    fn test_deploy_requires_built_image() {
        let backend = LocalBackend::with_config(LocalBackendConfig {
            ready_after_polls: 5,
        });
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        let err = backend
            .deploy(handle.image_id(), Target::Dev, "m-dev")
            .unwrap_err();
        assert!(matches!(err, Error::BuildFailed(_)));
    }

    #[test]
    fn test_prod_gets_auth_key_dev_does_not() {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        backend.build_status(handle.image_id()).unwrap();

        let dev = backend.deploy(handle.image_id(), Target::Dev, "m-dev").unwrap();
        let prod = backend.deploy(handle.image_id(), Target::Prod, "m-prod").unwrap();
        assert!(dev.auth_key().is_none());
        assert!(prod.auth_key().is_some());
        assert!(prod.scoring_uri().contains("m-prod"));
    }

    #[test]
    fn test_score_single_row() {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        backend.build_status(handle.image_id()).unwrap();
        backend.deploy(handle.image_id(), Target::Dev, "m-dev").unwrap();

        let columns = vec!["x".to_string()];
        let predictions = backend.score("m-dev", &columns, &[vec![4.0]]).unwrap();
        assert_eq!(predictions.len(), 1);
        assert!((predictions[0] - 9.0).abs() < 0.5);
    }

    // y = 10a + b, fitted exactly so column handling is observable in
    // the predictions.
    fn two_feature_payload() -> Vec<u8> {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![f64::from(i), f64::from((i * 3) % 7)])
            .collect();
        let target: Vec<f64> = rows.iter().map(|r| 10.0 * r[0] + r[1]).collect();
        let ds = Dataset::from_parts(
            vec!["a".to_string(), "b".to_string()],
            "y",
            rows,
            target,
        )
        .unwrap();
        let config = TrainConfig {
            alpha: 0.0,
            max_iter: 5000,
            tol: 1e-10,
            ..TrainConfig::default()
        };
        fit(&ds, &config).unwrap().to_artifact_bytes().unwrap()
    }

    fn deployed_two_feature_backend() -> LocalBackend {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, two_feature_payload()).unwrap();
        backend.build_status(handle.image_id()).unwrap();
        backend.deploy(handle.image_id(), Target::Dev, "m-dev").unwrap();
        backend
    }

    #[test]
    fn test_score_reorders_columns_by_name() {
        let backend = deployed_two_feature_backend();
        // a=5, b=2 sent with the columns swapped; y = 10*5 + 2 = 52.
        let columns = vec!["b".to_string(), "a".to_string()];
        let predictions = backend.score("m-dev", &columns, &[vec![2.0, 5.0]]).unwrap();
        assert!((predictions[0] - 52.0).abs() < 0.1, "prediction {}", predictions[0]);
    }

    #[test]
    fn test_score_rejects_unknown_column() {
        let backend = deployed_two_feature_backend();
        let columns = vec!["a".to_string(), "c".to_string()];
        let err = backend
            .score("m-dev", &columns, &[vec![5.0, 2.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Scoring(_)));
    }

    #[test]
    fn test_score_rejects_missing_column() {
        let backend = deployed_two_feature_backend();
        let columns = vec!["a".to_string()];
        let err = backend.score("m-dev", &columns, &[vec![5.0]]).unwrap_err();
        assert!(matches!(err, Error::Scoring(_)));
    }

    #[test]
    fn test_update_replaces_image_keeps_identity() {
        let backend = LocalBackend::new();
        let first = backend.start_build("m", 1, model_payload()).unwrap();
        backend.build_status(first.image_id()).unwrap();
        let deployed = backend
            .deploy(first.image_id(), Target::Prod, "m-prod")
            .unwrap();

        let second = backend.start_build("m", 2, model_payload()).unwrap();
        backend.build_status(second.image_id()).unwrap();
        let updated = backend.update("m-prod", second.image_id()).unwrap();

        assert_eq!(updated.name(), deployed.name());
        assert_eq!(updated.scoring_uri(), deployed.scoring_uri());
        assert_eq!(updated.auth_key(), deployed.auth_key());
        assert_eq!(updated.image_id(), second.image_id());
        assert_eq!(updated.version(), 2);
    }

    #[test]
    fn test_delete_endpoint() {
        let backend = LocalBackend::new();
        let handle = backend.start_build("m", 1, model_payload()).unwrap();
        backend.build_status(handle.image_id()).unwrap();
        backend.deploy(handle.image_id(), Target::Dev, "m-dev").unwrap();

        backend.delete("m-dev").unwrap();
        assert!(matches!(
            backend.endpoint("m-dev").unwrap_err(),
            Error::EndpointNotFound(_)
        ));
        assert!(matches!(
            backend.delete("m-dev").unwrap_err(),
            Error::EndpointNotFound(_)
        ));
    }
}

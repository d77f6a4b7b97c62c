//! HTTP facade: real-time scoring plus the registry REST surface.
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | POST | `/invocations/:endpoint` | score a JSON record batch |
//! | GET | `/models/:name/versions` | list registered versions |
//! | GET | `/models/:name/versions/:version/status` | poll registration status |
//! | GET | `/models/:name/events` | model event history |
//! | GET | `/health` | liveness |
//!
//! Scoring requests use split orientation: column names plus row-major
//! data. Columns are matched to the served model's features by name, so
//! any column order scores correctly and a mismatched column set is a
//! 400. Endpoints deployed to Prod carry a bearer credential; requests
//! without it get 401.

mod error;

pub use error::{ApiError, ErrorBody};

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::deploy::LocalBackend;
use crate::registry::{ModelRegistry, ModelVersion, RegistryEvent};
use crate::tracking::TrackingStore;

/// Shared state behind every route.
#[derive(Clone)]
pub struct AppState {
    /// Run recorder.
    pub tracking: Arc<TrackingStore>,
    /// Model registry.
    pub registry: Arc<ModelRegistry>,
    /// Deployment backend hosting the served endpoints.
    pub backend: Arc<LocalBackend>,
}

/// A JSON record batch in split orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Feature column names, in row order.
    pub columns: Vec<String>,
    /// Row-major feature values.
    pub data: Vec<Vec<f64>>,
}

/// Build the router over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/invocations/:endpoint", post(invoke))
        .route("/models/:name/versions", get(list_versions))
        .route("/models/:name/versions/:version/status", get(version_status))
        .route("/models/:name/events", get(model_events))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn invoke(
    State(state): State<AppState>,
    Path(endpoint_name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<Vec<f64>>, ApiError> {
    let endpoint = state.backend.endpoint(&endpoint_name)?;

    if let Some(expected) = endpoint.auth_key() {
        let presented = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected) {
            return Err(ApiError::Unauthorized);
        }
    }

    if request.data.is_empty() {
        return Err(ApiError::BadRequest("empty record batch".to_string()));
    }
    if request
        .data
        .iter()
        .any(|row| row.len() != request.columns.len())
    {
        return Err(ApiError::BadRequest(
            "row length does not match columns".to_string(),
        ));
    }

    let predictions = state
        .backend
        .score(&endpoint_name, &request.columns, &request.data)?;
    tracing::debug!(
        endpoint = endpoint_name,
        rows = request.data.len(),
        "scored record batch"
    );
    Ok(Json(predictions))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ModelVersion>>, ApiError> {
    let model = state.registry.get_model(&name)?;
    Ok(Json(model.versions().to_vec()))
}

async fn version_status(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, u64)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state.registry.poll_status(&name, version)?;
    Ok(Json(json!({
        "model": name,
        "version": version,
        "status": status,
    })))
}

async fn model_events(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<RegistryEvent>>, ApiError> {
    // Consistent with the registry: an unknown model has an empty
    // history rather than a 404, since deletion events outlive the model.
    Ok(Json(state.registry.events_for_model(&name)))
}

//! HTTP error mapping for the serving facade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::Error;

/// JSON error body returned by every failing route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error class
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// HTTP-facing error: a status code plus a JSON body.
#[derive(Debug)]
pub enum ApiError {
    /// 401 - missing or wrong bearer credential
    Unauthorized,
    /// 404 - model/version/endpoint/run does not exist
    NotFound(String),
    /// 400 - malformed scoring payload or request
    BadRequest(String),
    /// 409 - operation conflicts with current state
    Conflict(String),
    /// 500 - everything else
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid bearer token".to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };
        let body = ErrorBody {
            error: error.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::DatasetNotFound(_)
            | Error::ExperimentNotFound(_)
            | Error::RunNotFound(_)
            | Error::ModelNotFound(_)
            | Error::VersionNotFound { .. }
            | Error::ArtifactNotFound(_)
            | Error::ImageNotFound(_)
            | Error::EndpointNotFound(_) => Self::NotFound(err.to_string()),
            Error::RunFinalized(_) | Error::ParamRewrite { .. } | Error::DeleteBlocked { .. } => {
                Self::Conflict(err.to_string())
            }
            Error::Scoring(_) | Error::InvalidStage(_) | Error::Dataset(_) | Error::Manifest(_) => {
                Self::BadRequest(err.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let not_found: ApiError = Error::ModelNotFound("m".to_string()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let conflict: ApiError = Error::DeleteBlocked {
            model: "m".to_string(),
            active: 1,
        }
        .into();
        assert!(matches!(conflict, ApiError::Conflict(_)));

        let bad: ApiError = Error::Scoring("arity".to_string()).into();
        assert!(matches!(bad, ApiError::BadRequest(_)));
    }
}

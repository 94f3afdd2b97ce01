use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::queue::QueueError;
use crate::storage::StorageError;

/// Uniform error surface for the Worker API. Every component error
/// converts into one of these via `From` so the HTTP mapping below is
/// total: a new variant here is a compile error at the match until
/// handled.
#[derive(Debug, Error)]
pub enum WorkerApiError {
    #[error("{0}")]
    Validation(String),

    #[error("resource not found")]
    NotFound,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("hostname invalid: {0}")]
    InvalidHostname(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

impl WorkerApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            WorkerApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            WorkerApiError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            WorkerApiError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "permission_denied"),
            WorkerApiError::InvalidHostname(_) => {
                (StatusCode::PRECONDITION_FAILED, "invalid_hostname")
            }
            WorkerApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for WorkerApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "internal worker api failure")
            }
            _ => tracing::warn!(kind, error = %self, "worker api request failed"),
        }
        let body = ErrorBody { error: ErrorDetail { kind, message: self.to_string() } };
        (status, Json(body)).into_response()
    }
}

impl From<QueueError> for WorkerApiError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Validation(msg) => WorkerApiError::Validation(msg),
            QueueError::PermissionDenied(msg) => WorkerApiError::PermissionDenied(msg),
            QueueError::NotFound(_) | QueueError::JobDeleted(_) => WorkerApiError::NotFound,
            QueueError::Sqlite(err) => WorkerApiError::Internal(err.to_string()),
            QueueError::Serialization(err) => WorkerApiError::Internal(err.to_string()),
        }
    }
}

impl From<StorageError> for WorkerApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PermissionDenied(msg) => WorkerApiError::PermissionDenied(msg),
            StorageError::NotFound(_) => WorkerApiError::NotFound,
            StorageError::Io(err) => WorkerApiError::Internal(err.to_string()),
        }
    }
}

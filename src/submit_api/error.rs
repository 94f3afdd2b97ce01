use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::domain::CatalogError;

#[derive(Debug, Error)]
pub enum SubmitApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("worker api rejected submission: {0}")]
    Upstream(String),

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

impl SubmitApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            SubmitApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            SubmitApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SubmitApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
            SubmitApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for SubmitApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => {
                tracing::error!(error = %self, "submit api failure")
            }
            _ => tracing::warn!(kind, error = %self, "submit api request rejected"),
        }
        let body = ErrorBody { error: ErrorDetail { kind, message: self.to_string() } };
        (status, Json(body)).into_response()
    }
}

impl From<CatalogError> for SubmitApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownEntrypoint(..) => SubmitApiError::NotFound(err.to_string()),
            CatalogError::UnknownEnvVar(_) | CatalogError::MissingRequiredEnvVar(_) => {
                SubmitApiError::Validation(err.to_string())
            }
            CatalogError::Io(_) | CatalogError::Parse(_) => SubmitApiError::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for SubmitApiError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            SubmitApiError::NotFound(err.to_string())
        } else {
            SubmitApiError::Internal(err.to_string())
        }
    }
}

impl From<reqwest::Error> for SubmitApiError {
    fn from(err: reqwest::Error) -> Self {
        SubmitApiError::Upstream(err.to_string())
    }
}

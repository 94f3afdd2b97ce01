use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::ApiKeyAuth;
use crate::domain::SubmittedJob;

use super::error::WorkerApiError;
use super::models::{AccessInfo, CognitoAccessInfo};
use super::state::AppState;

pub async fn root() -> &'static str {
    "jobbroker worker api"
}

pub async fn access_info(State(state): State<AppState>) -> Json<AccessInfo> {
    Json(AccessInfo {
        cognito: CognitoAccessInfo {
            cognito_user_pool_id: state.config.cognito.user_pool_id.clone(),
            cognito_client_id: state.config.cognito.client_id.clone(),
            cognito_region: state.config.cognito.region.clone(),
        },
    })
}

/// `POST /_jobs`: accepts a fully-materialized `SubmittedJob` from the
/// Submit API and enqueues it verbatim.
pub async fn post_job(
    State(state): State<AppState>,
    _api_key: ApiKeyAuth,
    Json(submitted): Json<SubmittedJob>,
) -> Result<(StatusCode, Json<SubmittedJob>), WorkerApiError> {
    state.queue.enqueue(submitted.clone()).await?;
    state.metrics.job_enqueued();
    Ok((StatusCode::CREATED, Json(submitted)))
}

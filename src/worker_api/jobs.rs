use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::WorkerPrincipal;
use crate::domain::{JobFilterQuery, JobSpecs, JobStatus};

use super::error::WorkerApiError;
use super::models::StatusUpdate;
use super::state::AppState;

const DEFAULT_LIMIT: u32 = 1;

/// `GET /jobs`: a greedy multi-dequeue bounded by `limit`, matched
/// against the requester's server-derived environment and its filter
/// query.
pub async fn get_jobs(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Query(query): Query<JobFilterQuery>,
) -> Result<Json<HashMap<i64, JobSpecs>>, WorkerApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let filter = query.into_filter(principal.environment);

    let jobs = state.queue.dequeue_many(&principal.hostname, &filter, limit).await?;
    for _ in 0..jobs.len() {
        state.metrics.job_dequeued();
    }
    tracing::info!(
        hostname = %principal.hostname,
        method = "GET",
        path = "/jobs",
        dispatched = jobs.len(),
        "request handled"
    );
    Ok(Json(jobs.into_iter().collect()))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Path(id): Path<i64>,
) -> Result<Json<JobStatus>, WorkerApiError> {
    tracing::info!(hostname = %principal.hostname, method = "GET", path = "/jobs/{id}/status", job_id = id, "request handled");
    let job = state.queue.get_job(id, Some(&principal.hostname)).await?;
    Ok(Json(job.status))
}

pub async fn put_job_status(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<StatusCode, WorkerApiError> {
    tracing::info!(hostname = %principal.hostname, method = "PUT", path = "/jobs/{id}/status", job_id = id, status = ?update.status, "request handled");
    state
        .queue
        .update_job_status(id, update.status, update.runtime_details.as_deref(), Some(&principal.hostname))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

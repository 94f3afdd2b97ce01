use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::{ApiKeyAuth, UserPrincipal};
use crate::domain::{AppSpecs, Catalog, HandlerSpecs, JobSpecs, MetaSpecs, SubmittedJob};

use super::error::SubmitApiError;
use super::manifest;
use super::models::{JobStatusCallback, JobSubmission};
use super::state::AppState;

pub async fn root() -> &'static str {
    "jobbroker submit api"
}

/// Validates a submission against the catalog, resolves its inputs into
/// a download manifest, and forwards the materialized job to the
/// Worker API's internal enqueue endpoint.
pub async fn submit_job(
    State(state): State<AppState>,
    user: UserPrincipal,
    Json(submission): Json<JobSubmission>,
) -> Result<(StatusCode, Json<SubmittedJob>), SubmitApiError> {
    let entrypoint = state.catalog.lookup(
        &submission.application.application,
        &submission.application.version,
        &submission.application.entrypoint,
    )?;
    let env = Catalog::resolve_env(entrypoint, &submission.attributes.env_vars)?;

    let mut files_download = std::collections::HashMap::new();
    if let Some(config_id) = &submission.attributes.config_id {
        let path = format!("config/{config_id}");
        files_download.extend(manifest::enumerate_source(&state.config, &user.username, &path, "config").await?);
    }
    for data_id in &submission.attributes.data_ids {
        let path = format!("data/{data_id}");
        files_download.extend(manifest::enumerate_source(&state.config, &user.username, &path, "data").await?);
    }
    for artifact_id in &submission.attributes.artifact_ids {
        let path = format!("artifact/{artifact_id}");
        files_download.extend(manifest::enumerate_source(&state.config, &user.username, &path, "artifact").await?);
    }

    let job_id = uuid::Uuid::now_v7().to_string();
    let paths_upload = manifest::output_paths(&state.config, &user.username, &job_id);

    let submitted = SubmittedJob {
        job: JobSpecs {
            app: AppSpecs { cmd: entrypoint.cmd.clone(), env },
            handler: HandlerSpecs {
                image_url: entrypoint.image_url.clone(),
                batch_job_definition: None,
                files_download,
                files_upload: std::collections::HashMap::new(),
            },
            meta: MetaSpecs { job_id, date_created: chrono::Utc::now(), extra: std::collections::HashMap::new() },
            hardware: crate::domain::HardwareSpecs {
                cpu_cores: submission.hardware.cpu_cores,
                memory: submission.hardware.memory,
                gpu_mem: submission.hardware.gpu_mem,
                gpu_model: submission.hardware.gpu_model,
                gpu_archi: submission.hardware.gpu_archi,
            },
        },
        environment: submission.environment,
        group: None,
        priority: submission.priority.unwrap_or(5),
        paths_upload,
    };

    let response = state
        .http
        .post(format!("{}/_jobs", state.config.worker_api_url.trim_end_matches('/')))
        .header("x-api-key", state.config.internal_api_key.as_str())
        .json(&submitted)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SubmitApiError::Upstream(format!(
            "worker api responded with {}",
            response.status()
        )));
    }

    let accepted: SubmittedJob = response.json().await?;
    Ok((StatusCode::CREATED, Json(accepted)))
}

/// `POST /_job_status`: the Worker API's JobTracker callback. Accepted
/// and logged; forwarding it into user-visible persistence is the job
/// of the external collaborator this service sits in front of.
pub async fn receive_job_status(
    _api_key: ApiKeyAuth,
    Json(callback): Json<JobStatusCallback>,
) -> StatusCode {
    tracing::info!(job_id = callback.job_id, status = ?callback.status, "status callback received");
    StatusCode::NO_CONTENT
}

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;

use crate::auth::WorkerPrincipal;
use crate::storage::{FileBroker, FileHTTPRequest, StorageUri};

use super::error::WorkerApiError;
use super::models::{FileUploadQuery, UploadType};
use super::state::AppState;

const URL_SUFFIX: &str = "/url";

fn request_url(headers: &HeaderMap, path_and_query: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}{path_and_query}")
}

/// `GET /files/{path}/download`: streams the file directly. Only valid
/// against the local backend; S3 always rejects.
pub async fn download_file(
    State(state): State<AppState>,
    _principal: WorkerPrincipal,
    Path(path): Path<String>,
) -> Result<Response, WorkerApiError> {
    match state.storage.as_ref() {
        FileBroker::Local(broker) => {
            let file = broker.get_file(&path).await?;
            let stream = ReaderStream::new(file);
            Ok(Body::from_stream(stream).into_response())
        }
        FileBroker::S3(_) => Err(WorkerApiError::PermissionDenied(
            "use the presigned url endpoint against the s3 backend".to_string(),
        )),
    }
}

/// `GET /files/{path}/url`: a direct (local) or presigned (S3) download request.
pub async fn get_download_url(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FileHTTPRequest>, WorkerApiError> {
    let uri = StorageUri::parse(&path)?;
    let full_request_url = request_url(&headers, &format!("/files/{path}/url"));
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    tracing::info!(hostname = %principal.hostname, method = "GET", path = "/files/{path}/url", "request handled");
    let req = state.storage.get_file_url(&uri, &full_request_url, URL_SUFFIX, "/download", auth_header).await?;
    Ok(Json(req))
}

fn upload_path(paths_upload: &crate::domain::PathsUpload, upload_type: UploadType, base_path: &str) -> String {
    let root = match upload_type {
        UploadType::Output => &paths_upload.output,
        UploadType::Log => &paths_upload.log,
        UploadType::Artifact => &paths_upload.artifact,
    };
    if base_path.is_empty() {
        root.clone()
    } else {
        format!("{}/{}", root.trim_end_matches('/'), base_path.trim_start_matches('/'))
    }
}

/// `POST /jobs/{id}/files/upload`: a direct multipart upload, local
/// backend only.
pub async fn upload_file(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Path(id): Path<i64>,
    Query(query): Query<FileUploadQuery>,
    mut multipart: Multipart,
) -> Result<StatusCode, WorkerApiError> {
    let job = state.queue.get_job(id, Some(&principal.hostname)).await?;
    let path = upload_path(&job.paths_upload, query.upload_type, &query.base_path);
    let uri = StorageUri::parse(&path)?;

    let field = multipart
        .next_field()
        .await
        .map_err(|err| WorkerApiError::Validation(err.to_string()))?
        .ok_or_else(|| WorkerApiError::Validation("multipart body missing a file field".to_string()))?;
    let data = field
        .bytes()
        .await
        .map_err(|err| WorkerApiError::Validation(err.to_string()))?;

    match uri {
        StorageUri::Local(local_path) => {
            state.storage.post_file(&local_path, &data).await?;
            Ok(StatusCode::CREATED)
        }
        StorageUri::S3 { .. } => Err(WorkerApiError::PermissionDenied(
            "direct uploads are not supported against the s3 backend; use the presigned url endpoint".to_string(),
        )),
    }
}

/// `POST /jobs/{id}/files/url`: a presigned (or rewritten, for local)
/// upload request scoped to the job's upload prefix.
pub async fn get_upload_url(
    State(state): State<AppState>,
    principal: WorkerPrincipal,
    Path(id): Path<i64>,
    Query(query): Query<FileUploadQuery>,
    headers: HeaderMap,
) -> Result<Json<FileHTTPRequest>, WorkerApiError> {
    let job = state.queue.get_job(id, Some(&principal.hostname)).await?;
    let path = upload_path(&job.paths_upload, query.upload_type, &query.base_path);
    let uri = StorageUri::parse(&path)?;
    let full_request_url = request_url(&headers, &format!("/jobs/{id}/files/url"));

    let req = state.storage.post_file_url(&uri, &full_request_url, URL_SUFFIX, "/upload")?;
    Ok(Json(req))
}

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::CognitoVerifier;
use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::JobQueue;
use crate::storage::FileBroker;
use crate::timeout::TimeoutSupervisor;
use crate::tracker::JobTracker;

use super::files;
use super::internal;
use super::jobs;
use super::state::AppState;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(internal::root))
        .route("/access_info", get(internal::access_info))
        .route("/files/{*path}/download", get(files::download_file))
        .route("/files/{*path}/url", get(files::get_download_url))
        .route("/jobs", get(jobs::get_jobs))
        .route("/jobs/{id}/status", get(jobs::get_job_status).put(jobs::put_job_status))
        .route("/jobs/{id}/files/upload", post(files::upload_file))
        .route("/jobs/{id}/files/url", post(files::get_upload_url))
        .route("/_jobs", post(internal::post_job))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn run(address: SocketAddr, config: Config) -> Result<(), AnyError> {
    let db_conn = rusqlite::Connection::open(&config.queue_db_url)?;
    let tracker = Arc::new(JobTracker::new(config.userfacing_api_url.clone(), config.internal_api_key.clone()));
    let queue = Arc::new(JobQueue::new(db_conn, tracker, config.retry_different));
    queue.create(false).await?;

    let storage = Arc::new(FileBroker::from_config(&config)?);
    let cognito = Arc::new(CognitoVerifier::new(&config.cognito));
    let metrics = Arc::new(Metrics::new());

    let supervisor = Arc::new(TimeoutSupervisor::new(
        queue.clone(),
        config.max_retries,
        config.timeout_failure_secs as i64,
        metrics.clone(),
    ));
    let supervisor_handle = supervisor.spawn();

    let state = AppState {
        internal_api_key: Arc::from(config.internal_api_key.as_str()),
        config: Arc::new(config),
        queue,
        storage,
        cognito,
        metrics,
    };

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "worker api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor_handle.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

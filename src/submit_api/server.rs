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
use crate::domain::Catalog;

use super::handlers;
use super::state::AppState;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/jobs", post(handlers::submit_job))
        .route("/_job_status", post(handlers::receive_job_status))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn run(address: SocketAddr, config: Config) -> Result<(), AnyError> {
    let catalog = Arc::new(Catalog::load(&config.catalog_path)?);
    let cognito = Arc::new(CognitoVerifier::new(&config.cognito));

    let state = AppState {
        internal_api_key: Arc::from(config.internal_api_key.as_str()),
        catalog,
        http: reqwest::Client::new(),
        cognito,
        config: Arc::new(config),
    };

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "submit api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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

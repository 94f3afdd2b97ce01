use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::CognitoVerifier;
use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::JobQueue;
use crate::storage::FileBroker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: Arc<JobQueue>,
    pub storage: Arc<FileBroker>,
    pub cognito: Arc<CognitoVerifier>,
    pub internal_api_key: Arc<str>,
    pub metrics: Arc<Metrics>,
}

impl FromRef<AppState> for Arc<CognitoVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.cognito.clone()
    }
}

impl FromRef<AppState> for Arc<str> {
    fn from_ref(state: &AppState) -> Self {
        state.internal_api_key.clone()
    }
}

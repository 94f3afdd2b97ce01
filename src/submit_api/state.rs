use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::CognitoVerifier;
use crate::config::Config;
use crate::domain::Catalog;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub http: reqwest::Client,
    pub cognito: Arc<CognitoVerifier>,
    pub internal_api_key: Arc<str>,
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

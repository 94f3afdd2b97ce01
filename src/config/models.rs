use std::path::PathBuf;

use serde::Deserialize;

/// Which object-store backend the FileBroker talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemProvider {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub user_pool_id: String,
    pub client_id: String,
    pub region: String,
}

/// Fully-resolved configuration shared by both binaries.
///
/// Loaded once at startup (see [`crate::config::sources::load`]); neither
/// binary re-reads the environment afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub filesystem: FilesystemProvider,
    pub s3: Option<S3Config>,
    pub user_data_root_path: PathBuf,

    pub queue_db_url: String,

    pub max_retries: u32,
    pub timeout_failure_secs: u64,
    pub retry_different: bool,

    pub userfacing_api_url: String,
    pub internal_api_key: String,

    /// Where the Submit API forwards materialized jobs. Distinct from
    /// `userfacing_api_url`, which is the direction the Worker API's
    /// JobTracker calls back toward the Submit API.
    pub worker_api_url: String,
    /// YAML application/version/entrypoint catalog, loaded once at
    /// startup by the Submit API.
    pub catalog_path: PathBuf,

    pub cognito: CognitoConfig,
}

/// Shape mirroring the flat environment variables named in the
/// external-interfaces contract, before defaulting and secret
/// resolution. Field names are lowercase so `config::Environment`'s
/// default case folding lines them up with the uppercase env vars.
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    pub filesystem: Option<FilesystemProvider>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub user_data_root_path: Option<String>,

    pub queue_db_url: Option<String>,
    pub queue_db_secret: Option<String>,

    pub max_retries: Option<u32>,
    pub timeout_failure: Option<u64>,
    pub retry_different: Option<bool>,

    pub userfacing_api_url: Option<String>,
    pub internal_api_key_secret: Option<String>,
    pub worker_api_url: Option<String>,
    pub catalog_path: Option<String>,

    pub cognito_user_pool_id: Option<String>,
    pub cognito_client_id: Option<String>,
    pub cognito_region: Option<String>,
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Environment, JobStatus};

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSelector {
    pub application: String,
    pub version: String,
    pub entrypoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardwareOverride {
    #[serde(default)]
    pub cpu_cores: Option<i64>,
    #[serde(default)]
    pub memory: Option<i64>,
    #[serde(default)]
    pub gpu_mem: Option<i64>,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub gpu_archi: Option<String>,
}

/// The three logical-id groupings the original catalog-driven submission
/// accepted: a single config tree, and lists of data/artifact trees,
/// each resolved against the submitter's own file tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputAttributes {
    #[serde(default)]
    pub config_id: Option<String>,
    #[serde(default)]
    pub data_ids: Vec<String>,
    #[serde(default)]
    pub artifact_ids: Vec<String>,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
}

/// The user-facing submission body: an (application, version, entrypoint)
/// triple plus the inputs and environment overrides the catalog allows.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmission {
    pub application: ApplicationSelector,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub hardware: HardwareOverride,
    pub attributes: InputAttributes,
}

/// What the Worker API's JobTracker posts back on every status
/// transition, accepted verbatim and acknowledged. Persisting it into
/// user-visible state is the job of the out-of-scope user-facing
/// persistence layer this service would sit in front of.
#[derive(Debug, Deserialize, Serialize)]
pub struct JobStatusCallback {
    pub job_id: i64,
    pub status: JobStatus,
    #[serde(default)]
    pub runtime_details: Option<String>,
}

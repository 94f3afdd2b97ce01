use serde::{Deserialize, Serialize};

use super::status::Environment;

/// The pull predicate a worker presents to `GET /jobs`.
///
/// `environment` and `memory` are supplied by the server: `environment`
/// is derived from the caller's identity-provider groups (never taken
/// from the query string) and `memory` is required from the worker.
/// Everything else defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFilter {
    pub environment: Environment,
    #[serde(default)]
    pub older_than: i64,
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: i64,
    pub memory: i64,
    #[serde(default)]
    pub gpu_mem: i64,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub gpu_archi: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_cpu_cores() -> i64 {
    1
}

impl JobFilter {
    pub fn new(environment: Environment, memory: i64) -> Self {
        Self {
            environment,
            older_than: 0,
            cpu_cores: default_cpu_cores(),
            memory,
            gpu_mem: 0,
            gpu_model: None,
            gpu_archi: None,
            groups: Vec::new(),
        }
    }
}

/// Raw query parameters accepted on `GET /jobs`, deserialized from the
/// URL by axum's `Query` extractor before being combined with the
/// server-derived environment into a [`JobFilter`].
#[derive(Debug, Clone, Deserialize)]
pub struct JobFilterQuery {
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: i64,
    pub memory: i64,
    #[serde(default)]
    pub gpu_mem: i64,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub gpu_archi: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub older_than: i64,
    pub limit: Option<u32>,
}

impl JobFilterQuery {
    pub fn into_filter(self, environment: Environment) -> JobFilter {
        JobFilter {
            environment,
            older_than: self.older_than,
            cpu_cores: self.cpu_cores,
            memory: self.memory,
            gpu_mem: self.gpu_mem,
            gpu_model: self.gpu_model,
            gpu_archi: self.gpu_archi,
            groups: self.groups,
        }
    }
}

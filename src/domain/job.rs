use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{Environment, JobStatus};

/// Command and environment variables the worker's container runtime invokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSpecs {
    pub cmd: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// How to run the job and what files it needs before/after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSpecs {
    pub image_url: String,
    #[serde(default)]
    pub batch_job_definition: Option<String>,
    /// container-local path -> source URI
    #[serde(default)]
    pub files_download: HashMap<String, String>,
    /// {output, log, artifact} -> container-local path
    #[serde(default)]
    pub files_upload: HashMap<String, String>,
}

/// Submitter-side identifiers and open-ended extensions, passed through
/// unchanged so the Submit API can correlate callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSpecs {
    pub job_id: String,
    pub date_created: DateTime<Utc>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Resource demands. Carried both as dedicated `QueuedJob` columns (for
/// indexed selection) and redundantly here so the worker sees exactly
/// what it was matched against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareSpecs {
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

/// Opaque job specification, returned verbatim to the worker that pulls it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpecs {
    pub app: AppSpecs,
    pub handler: HandlerSpecs,
    pub meta: MetaSpecs,
    pub hardware: HardwareSpecs,
}

/// Write destinations for a job's three output classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsUpload {
    pub output: String,
    pub log: String,
    pub artifact: String,
}

/// The enqueue envelope the Submit API builds and hands to the Worker
/// API's internal `POST /_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub job: JobSpecs,
    pub environment: Environment,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub paths_upload: PathsUpload,
}

fn default_priority() -> i64 {
    5
}

/// A row of the `queued_jobs` table: the single core entity.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: i64,
    pub creation_timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub status: JobStatus,
    pub num_retries: u32,
    pub job: JobSpecs,
    pub paths_upload: PathsUpload,
    pub environment: Environment,
    pub cpu_cores: Option<i64>,
    pub memory: Option<i64>,
    pub gpu_mem: Option<i64>,
    pub gpu_model: Option<String>,
    pub gpu_archi: Option<String>,
    pub group: Option<String>,
    pub priority: i64,
    /// Append-only audit of every worker ever handed this job. The tail
    /// is the current lease-holder, if any.
    pub workers: Vec<String>,
}

impl QueuedJob {
    pub fn current_lease_holder(&self) -> Option<&str> {
        self.workers.last().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_job_round_trips_through_json() {
        let submitted = SubmittedJob {
            job: JobSpecs {
                app: AppSpecs {
                    cmd: vec!["run.sh".into()],
                    env: HashMap::new(),
                },
                handler: HandlerSpecs {
                    image_url: "registry/app:1".into(),
                    batch_job_definition: None,
                    files_download: HashMap::new(),
                    files_upload: HashMap::new(),
                },
                meta: MetaSpecs {
                    job_id: "job-1".into(),
                    date_created: Utc::now(),
                    extra: HashMap::new(),
                },
                hardware: HardwareSpecs::default(),
            },
            environment: Environment::Any,
            group: None,
            priority: 5,
            paths_upload: PathsUpload {
                output: "s3://bucket/out".into(),
                log: "s3://bucket/log".into(),
                artifact: "s3://bucket/artifact".into(),
            },
        };

        let json = serde_json::to_value(&submitted).unwrap();
        assert!(json["environment"].is_null());

        let back: SubmittedJob = serde_json::from_value(json).unwrap();
        assert_eq!(back.job.meta.job_id, "job-1");
        assert_eq!(back.environment, Environment::Any);
    }
}

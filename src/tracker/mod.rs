//! Outbound status-change callback to the Submit API.
//!
//! A POST to the submitter-facing service's private `/_job_status`
//! endpoint, carrying the shared API key. A 404 means the submitter has
//! deleted the underlying submission; every other non-2xx is a plain
//! failure the caller logs and moves on from, since the TimeoutSupervisor
//! or the next status transition will attempt the callback again.

use serde::Serialize;
use thiserror::Error;

use crate::domain::JobStatus;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("submitter record for job {0} was deleted")]
    JobDeleted(i64),

    #[error("job tracker callback for job {job_id} failed with status {status}")]
    Upstream { job_id: i64, status: u16 },

    #[error("job tracker request error: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct JobStatusCallback<'a> {
    job_id: i64,
    status: JobStatus,
    runtime_details: Option<&'a str>,
}

/// Notifies the Submit API when a queue row changes state.
pub struct JobTracker {
    client: reqwest::Client,
    submit_api_url: String,
    api_key: String,
}

impl JobTracker {
    pub fn new(submit_api_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            submit_api_url,
            api_key,
        }
    }

    pub async fn notify(
        &self,
        job_id: i64,
        status: JobStatus,
        runtime_details: Option<&str>,
    ) -> Result<(), TrackerError> {
        let url = format!("{}/_job_status", self.submit_api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&JobStatusCallback {
                job_id,
                status,
                runtime_details,
            })
            .send()
            .await?;

        match response.status().as_u16() {
            200..=299 => Ok(()),
            404 => {
                tracing::warn!(job_id, "submit api reports job deleted");
                Err(TrackerError::JobDeleted(job_id))
            }
            other => {
                tracing::warn!(job_id, status = other, "job tracker callback failed");
                Err(TrackerError::Upstream {
                    job_id,
                    status: other,
                })
            }
        }
    }
}

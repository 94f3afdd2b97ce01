//! The durable job store and lease protocol, the largest single
//! component. Backed by SQLite; `pop` and every other write compose
//! under a single `tokio::sync::Mutex` guarding the one connection,
//! mirroring the process-local-mutex requirement for SQLite-class
//! stores without real row locking. Shaped after a `TaskBroker { queue:
//! Arc<RwLock<...>> }` broker, swapped to a `Mutex` since nearly every
//! call here mutates.

mod error;
mod select;
mod store;

pub use error::QueueError;
pub use store::{WORKER_DELIMITER, join_workers, split_workers};

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{Connection, params};
use tokio::sync::Mutex;

use crate::domain::{Environment, JobFilter, JobSpecs, JobStatus, QueuedJob};
use crate::tracker::{JobTracker, TrackerError};

/// Opaque token returned by [`JobQueue::peek`] and consumed by
/// [`JobQueue::pop`], identifying the exact row-and-requester pair a
/// subsequent pop must re-validate before claiming.
#[derive(Debug, Clone)]
pub struct ReceiptHandle {
    job_id: i64,
    hostname: String,
}

pub struct JobQueue {
    conn: Arc<Mutex<Connection>>,
    tracker: Arc<JobTracker>,
    no_retry_same_worker: bool,
}

impl JobQueue {
    pub fn new(conn: Connection, tracker: Arc<JobTracker>, no_retry_same_worker: bool) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            tracker,
            no_retry_same_worker,
        }
    }

    /// Idempotent schema creation. `err_on_exists` asks for a hard
    /// error rather than a silent no-op, useful for one-shot migration
    /// tooling that wants to detect "already initialized".
    pub async fn create(&self, err_on_exists: bool) -> Result<(), QueueError> {
        let conn = self.conn.lock().await;
        store::create_schema(&conn, err_on_exists)
    }

    pub async fn delete(&self) -> Result<(), QueueError> {
        let conn = self.conn.lock().await;
        store::drop_schema(&conn)
    }

    pub async fn enqueue(
        &self,
        submitted: crate::domain::SubmittedJob,
    ) -> Result<i64, QueueError> {
        let conn = self.conn.lock().await;
        store::insert_submitted_job(&conn, &submitted)
    }

    /// Read-only: selects the job a subsequent `pop` would claim
    /// without mutating any state.
    pub async fn peek(
        &self,
        hostname: &str,
        filter: &JobFilter,
    ) -> Result<Option<(i64, JobSpecs, ReceiptHandle)>, QueueError> {
        let conn = self.conn.lock().await;
        self.peek_locked(&conn, hostname, filter)
    }

    fn peek_locked(
        &self,
        conn: &Connection,
        hostname: &str,
        filter: &JobFilter,
    ) -> Result<Option<(i64, JobSpecs, ReceiptHandle)>, QueueError> {
        let candidate = select::select_candidate(conn, hostname, filter, self.no_retry_same_worker)?;
        Ok(candidate.map(|job| {
            (
                job.id,
                job.job,
                ReceiptHandle {
                    job_id: job.id,
                    hostname: hostname.to_string(),
                },
            )
        }))
    }

    /// Atomically verifies the receipt's row is still `queued`, appends
    /// the requester to `workers`, and transitions it to `pulled`.
    /// Returns `false` (never an error) if the row was claimed by
    /// someone else since the matching `peek`.
    pub async fn pop(
        &self,
        environment: Environment,
        receipt: &ReceiptHandle,
    ) -> Result<bool, QueueError> {
        let popped = {
            let conn = self.conn.lock().await;
            self.pop_locked(&conn, environment, receipt)?
        };
        if popped {
            self.notify_best_effort(receipt.job_id, JobStatus::Pulled, None).await;
        }
        Ok(popped)
    }

    /// Does not await; callers hold the connection lock across this
    /// call and must drop it before notifying the tracker.
    fn pop_locked(
        &self,
        conn: &Connection,
        _environment: Environment,
        receipt: &ReceiptHandle,
    ) -> Result<bool, QueueError> {
        let current_status: Option<String> = conn
            .query_row(
                "SELECT status FROM queued_jobs WHERE id = ?1",
                params![receipt.job_id],
                |row| row.get(0),
            )
            .ok();

        if current_status.as_deref() != Some(JobStatus::Queued.as_db_str()) {
            return Ok(false);
        }

        let new_workers = {
            let raw: String = conn.query_row(
                "SELECT workers FROM queued_jobs WHERE id = ?1",
                params![receipt.job_id],
                |row| row.get(0),
            )?;
            let mut workers = store::split_workers(&raw);
            workers.push(receipt.hostname.clone());
            store::join_workers(&workers)
        };

        let updated = conn.execute(
            "UPDATE queued_jobs SET status = ?1, last_updated = ?2, workers = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                JobStatus::Pulled.as_db_str(),
                Utc::now().to_rfc3339(),
                new_workers,
                receipt.job_id,
                JobStatus::Queued.as_db_str(),
            ],
        )?;

        if updated == 0 {
            return Ok(false);
        }

        Ok(true)
    }

    /// Composition of peek + pop within a single locked section, so two
    /// concurrent workers can never both be returned the same id.
    /// Retries internally on a lost pop race.
    pub async fn dequeue(
        &self,
        hostname: &str,
        filter: &JobFilter,
    ) -> Result<Option<(i64, JobSpecs)>, QueueError> {
        loop {
            let outcome = {
                let conn = self.conn.lock().await;
                let Some((id, spec, receipt)) = self.peek_locked(&conn, hostname, filter)? else {
                    return Ok(None);
                };
                let popped = self.pop_locked(&conn, filter.environment, &receipt)?;
                (popped, id, spec, receipt)
            };
            let (popped, id, spec, receipt) = outcome;
            if popped {
                self.notify_best_effort(receipt.job_id, JobStatus::Pulled, None).await;
                return Ok(Some((id, spec)));
            }
            // Lost the race: drop the lock and retry against fresh state.
        }
    }

    /// Greedily dequeues up to `limit` jobs in one call.
    pub async fn dequeue_many(
        &self,
        hostname: &str,
        filter: &JobFilter,
        limit: u32,
    ) -> Result<Vec<(i64, JobSpecs)>, QueueError> {
        let mut out = Vec::new();
        for _ in 0..limit {
            match self.dequeue(hostname, filter).await? {
                Some(job) => out.push(job),
                None => break,
            }
        }
        Ok(out)
    }

    /// Fetches a row. If `hostname` is given, the caller must be the
    /// current lease-holder or the lookup is treated as not found, to
    /// avoid leaking another worker's job state.
    pub async fn get_job(
        &self,
        id: i64,
        hostname: Option<&str>,
    ) -> Result<QueuedJob, QueueError> {
        let conn = self.conn.lock().await;
        let job = store::fetch_by_id(&conn, id)?.ok_or(QueueError::NotFound(id))?;
        if let Some(hostname) = hostname {
            if job.current_lease_holder() != Some(hostname) {
                return Err(QueueError::NotFound(id));
            }
        }
        Ok(job)
    }

    /// Row-locked status write. Only the current lease-holder may
    /// transition a job; a terminal status never moves again. Calls the
    /// JobTracker after the commit; a `JobDeleted` response deletes the
    /// row and is propagated so the worker sees a 404 and cancels.
    pub async fn update_job_status(
        &self,
        id: i64,
        new_status: JobStatus,
        runtime_details: Option<&str>,
        hostname: Option<&str>,
    ) -> Result<(), QueueError> {
        let conn = self.conn.lock().await;
        let job = store::fetch_by_id(&conn, id)?.ok_or(QueueError::NotFound(id))?;

        if job.status.is_terminal() {
            return Err(QueueError::Validation(format!(
                "job {id} is already in terminal status {:?}",
                job.status
            )));
        }

        if let Some(hostname) = hostname {
            if job.current_lease_holder() != Some(hostname) {
                return Err(QueueError::NotFound(id));
            }
        }

        conn.execute(
            "UPDATE queued_jobs SET status = ?1, last_updated = ?2 WHERE id = ?3",
            params![new_status.as_db_str(), Utc::now().to_rfc3339(), id],
        )?;
        drop(conn);

        match self.tracker.notify(id, new_status, runtime_details).await {
            Ok(()) => Ok(()),
            Err(TrackerError::JobDeleted(_)) => {
                let conn = self.conn.lock().await;
                conn.execute("DELETE FROM queued_jobs WHERE id = ?1", params![id])?;
                Err(QueueError::JobDeleted(id))
            }
            Err(other) => {
                tracing::warn!(job_id = id, error = %other, "job tracker callback failed");
                Ok(())
            }
        }
    }

    /// Best-effort notification used from `pop`, where a tracker
    /// failure must not undo an already-claimed lease.
    async fn notify_best_effort(&self, id: i64, status: JobStatus, runtime_details: Option<&str>) {
        if let Err(err) = self.tracker.notify(id, status, runtime_details).await {
            tracing::warn!(job_id = id, error = %err, "job tracker callback failed");
        }
    }

    /// Scans for stalled leases and requeues or fails them.
    /// Returns `(num_requeued, num_failed)`.
    pub async fn handle_timeouts(
        &self,
        max_retries: u32,
        timeout_seconds: i64,
    ) -> Result<(u32, u32), QueueError> {
        enum Outcome {
            Requeued { id: i64, attempt: u32, workers: String },
            Failed { id: i64 },
        }

        let outcomes: Vec<Outcome> = {
            let conn = self.conn.lock().await;
            let cutoff = (Utc::now() - chrono::Duration::seconds(timeout_seconds)).to_rfc3339();

            let leased_list = JobStatus::ALL
                .iter()
                .filter(|status| status.is_leased())
                .map(|status| format!("'{}'", status.as_db_str()))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT id, num_retries, workers FROM queued_jobs
                 WHERE status IN ({leased_list})
                 AND last_updated < ?1",
            ))?;
            let stalled: Vec<(i64, u32, String)> = stmt
                .query_map(params![cutoff], |row| {
                    Ok((row.get(0)?, row.get::<_, i64>(1)? as u32, row.get(2)?))
                })?
                .collect::<Result<_, _>>()?;
            drop(stmt);

            let mut outcomes = Vec::new();
            for (id, num_retries, workers) in stalled {
                if num_retries < max_retries {
                    conn.execute(
                        "UPDATE queued_jobs SET status = ?1, num_retries = ?2, last_updated = ?3 WHERE id = ?4",
                        params![
                            JobStatus::Queued.as_db_str(),
                            num_retries + 1,
                            Utc::now().to_rfc3339(),
                            id
                        ],
                    )?;
                    outcomes.push(Outcome::Requeued { id, attempt: num_retries + 1, workers });
                } else {
                    conn.execute(
                        "UPDATE queued_jobs SET status = ?1, last_updated = ?2 WHERE id = ?3",
                        params![JobStatus::Error.as_db_str(), Utc::now().to_rfc3339(), id],
                    )?;
                    outcomes.push(Outcome::Failed { id });
                }
            }
            outcomes
        };

        let mut num_requeued = 0;
        let mut num_failed = 0;

        for outcome in outcomes {
            match outcome {
                Outcome::Requeued { id, attempt, workers } => {
                    num_requeued += 1;
                    self.notify_best_effort(
                        id,
                        JobStatus::Queued,
                        Some(&format!("timeout {attempt} (workers tried: {workers})")),
                    )
                    .await;
                }
                Outcome::Failed { id } => {
                    num_failed += 1;
                    self.notify_best_effort(id, JobStatus::Error, Some("max retries reached")).await;
                }
            }
        }

        Ok((num_requeued, num_failed))
    }
}

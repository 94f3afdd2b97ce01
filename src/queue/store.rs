use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{Environment, JobSpecs, JobStatus, PathsUpload, QueuedJob, SubmittedJob};

use super::error::QueueError;

/// Delimiter joining the `workers` audit trail in its single TEXT
/// column. Hostnames are rejected at the HTTP boundary if they contain
/// this character.
pub const WORKER_DELIMITER: char = ';';

pub fn join_workers(workers: &[String]) -> String {
    workers.join(&WORKER_DELIMITER.to_string())
}

pub fn split_workers(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(WORKER_DELIMITER).map(str::to_string).collect()
    }
}

pub fn create_schema(conn: &Connection, err_on_exists: bool) -> Result<(), QueueError> {
    if err_on_exists {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'queued_jobs'",
                [],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if exists {
            return Err(QueueError::Validation(
                "queued_jobs table already exists".to_string(),
            ));
        }
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS queued_jobs (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            creation_timestamp  TEXT NOT NULL,
            last_updated        TEXT NOT NULL,
            status              TEXT NOT NULL,
            num_retries         INTEGER NOT NULL DEFAULT 0,
            job_json            TEXT NOT NULL,
            paths_upload_json   TEXT NOT NULL,
            environment         TEXT,
            cpu_cores           INTEGER,
            memory              INTEGER,
            gpu_mem             INTEGER,
            gpu_model           TEXT,
            gpu_archi           TEXT,
            group_name          TEXT,
            priority            INTEGER NOT NULL,
            workers             TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_queued_jobs_selection
            ON queued_jobs (status, environment, priority DESC, creation_timestamp ASC);
        CREATE INDEX IF NOT EXISTS idx_queued_jobs_timeout
            ON queued_jobs (status, last_updated);",
    )?;
    Ok(())
}

pub fn drop_schema(conn: &Connection) -> Result<(), QueueError> {
    conn.execute_batch("DROP TABLE IF EXISTS queued_jobs;")?;
    Ok(())
}

pub fn insert_submitted_job(conn: &Connection, submitted: &SubmittedJob) -> Result<i64, QueueError> {
    let now = Utc::now();
    let job_json = serde_json::to_string(&submitted.job)?;
    let paths_upload_json = serde_json::to_string(&submitted.paths_upload)?;
    let hardware = &submitted.job.hardware;

    conn.execute(
        "INSERT INTO queued_jobs (
            creation_timestamp, last_updated, status, num_retries,
            job_json, paths_upload_json, environment,
            cpu_cores, memory, gpu_mem, gpu_model, gpu_archi,
            group_name, priority, workers
        ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, '')",
        params![
            now.to_rfc3339(),
            now.to_rfc3339(),
            JobStatus::Queued.as_db_str(),
            job_json,
            paths_upload_json,
            submitted.environment.as_db_str(),
            hardware.cpu_cores,
            hardware.memory,
            hardware.gpu_mem,
            hardware.gpu_model,
            hardware.gpu_archi,
            submitted.group,
            submitted.priority,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn row_to_queued_job(row: &Row) -> rusqlite::Result<QueuedJob> {
    let creation_timestamp: String = row.get("creation_timestamp")?;
    let last_updated: String = row.get("last_updated")?;
    let status: String = row.get("status")?;
    let job_json: String = row.get("job_json")?;
    let paths_upload_json: String = row.get("paths_upload_json")?;
    let environment: Option<String> = row.get("environment")?;
    let workers: String = row.get("workers")?;

    let job: JobSpecs = serde_json::from_str(&job_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let paths_upload: PathsUpload = serde_json::from_str(&paths_upload_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(QueuedJob {
        id: row.get("id")?,
        creation_timestamp: parse_timestamp(&creation_timestamp)?,
        last_updated: parse_timestamp(&last_updated)?,
        status: JobStatus::from_db_str(&status).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(0, "status".into(), rusqlite::types::Type::Text)
        })?,
        num_retries: row.get::<_, i64>("num_retries")? as u32,
        job,
        paths_upload,
        environment: Environment::from_db_str(environment.as_deref()),
        cpu_cores: row.get("cpu_cores")?,
        memory: row.get("memory")?,
        gpu_mem: row.get("gpu_mem")?,
        gpu_model: row.get("gpu_model")?,
        gpu_archi: row.get("gpu_archi")?,
        group: row.get("group_name")?,
        priority: row.get("priority")?,
        workers: split_workers(&workers),
    })
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub fn fetch_by_id(conn: &Connection, id: i64) -> Result<Option<QueuedJob>, QueueError> {
    conn.query_row(
        "SELECT * FROM queued_jobs WHERE id = ?1",
        params![id],
        row_to_queued_job,
    )
    .optional()
    .map_err(QueueError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_list_round_trips() {
        let workers = vec!["host-a".to_string(), "host-b".to_string()];
        let joined = join_workers(&workers);
        assert_eq!(joined, "host-a;host-b");
        assert_eq!(split_workers(&joined), workers);
    }

    #[test]
    fn empty_workers_round_trips() {
        assert!(split_workers("").is_empty());
        assert_eq!(join_workers(&[]), "");
    }
}

use chrono::{Duration, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, params_from_iter};

use crate::domain::{JobFilter, QueuedJob};

use super::error::QueueError;
use super::store::row_to_queued_job;

const BASE_PREDICATE: &str = "
    status = 'queued'
    AND (environment = ?1 OR (environment IS NULL AND creation_timestamp < ?2))
    AND (cpu_cores <= ?3 OR cpu_cores IS NULL)
    AND (memory <= ?4 OR memory IS NULL)
    AND (gpu_mem <= ?5 OR gpu_mem IS NULL)
    AND (gpu_model = ?6 OR gpu_model IS NULL)
    AND (gpu_archi = ?7 OR gpu_archi IS NULL)
";

const NO_RETRY_PREDICATE: &str =
    " AND (';' || workers || ';') NOT LIKE ('%;' || ?8 || ';%') ESCAPE '\\'";

const ORDER_AND_LIMIT: &str = " ORDER BY priority DESC, creation_timestamp ASC LIMIT 1";

fn escape_like(hostname: &str) -> String {
    hostname.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Run the two-pass selection algorithm:
/// restrict to the requester's own affinity groups first, falling back
/// to the full eligible set if that pass is empty.
pub fn select_candidate(
    conn: &Connection,
    hostname: &str,
    filter: &JobFilter,
    no_retry_same_worker: bool,
) -> Result<Option<QueuedJob>, QueueError> {
    if !filter.groups.is_empty() {
        if let Some(job) = select_pass(conn, hostname, filter, no_retry_same_worker, Some(&filter.groups))? {
            return Ok(Some(job));
        }
    }
    select_pass(conn, hostname, filter, no_retry_same_worker, None)
}

fn select_pass(
    conn: &Connection,
    hostname: &str,
    filter: &JobFilter,
    no_retry_same_worker: bool,
    groups: Option<&[String]>,
) -> Result<Option<QueuedJob>, QueueError> {
    let cutoff = (Utc::now() - Duration::seconds(filter.older_than)).to_rfc3339();
    let escaped_hostname = escape_like(hostname);

    let mut sql = format!("SELECT * FROM queued_jobs WHERE {BASE_PREDICATE}");
    let mut params: Vec<Box<dyn ToSql>> = vec![
        Box::new(filter.environment.as_db_str()),
        Box::new(cutoff),
        Box::new(filter.cpu_cores),
        Box::new(filter.memory),
        Box::new(filter.gpu_mem),
        Box::new(filter.gpu_model.clone()),
        Box::new(filter.gpu_archi.clone()),
    ];

    if no_retry_same_worker {
        sql.push_str(NO_RETRY_PREDICATE);
        params.push(Box::new(escaped_hostname));
    }

    if let Some(groups) = groups {
        let placeholders: Vec<String> = (0..groups.len())
            .map(|i| format!("?{}", params.len() + i + 1))
            .collect();
        sql.push_str(&format!(" AND group_name IN ({})", placeholders.join(", ")));
        for group in groups {
            params.push(Box::new(group.clone()));
        }
    }

    sql.push_str(ORDER_AND_LIMIT);

    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    conn.query_row(&sql, params_from_iter(param_refs), row_to_queued_job)
        .optional()
        .map_err(QueueError::from)
}

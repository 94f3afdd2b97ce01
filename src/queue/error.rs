use thiserror::Error;

/// Domain error taxonomy for the JobQueue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("job {0} not found")]
    NotFound(i64),

    #[error("job {0} was deleted by the submitter")]
    JobDeleted(i64),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed job payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

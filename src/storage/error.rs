use thiserror::Error;

/// FileBroker error taxonomy. Path-scoping is the only authorization
/// this component performs; these two kinds are the whole of it.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

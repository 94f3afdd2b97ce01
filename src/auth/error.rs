use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,

    #[error("token verification failed: {0}")]
    InvalidToken(String),

    #[error("principal is not a member of the 'workers' group")]
    NotAWorker,

    #[error("hostname must not contain ';': {0}")]
    InvalidHostname(String),

    #[error("missing or invalid x-api-key header")]
    InvalidApiKey,

    #[error("failed to fetch identity provider keys: {0}")]
    Jwks(String),
}

//! AuthN/Z adapters: Cognito claims
//! become a [`WorkerPrincipal`] via axum extractors, and the internal
//! API key gates the two service-to-service endpoints.

mod claims;
mod error;
mod jwks;

pub use claims::{UserPrincipal, WorkerClaims, WorkerPrincipal};
pub use error::AuthError;
pub use jwks::CognitoVerifier;

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::InvalidApiKey
            | AuthError::NotAWorker => StatusCode::UNAUTHORIZED,
            AuthError::InvalidHostname(_) => StatusCode::PRECONDITION_FAILED,
            AuthError::Jwks(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Extracts and verifies the `Authorization: Bearer` header, mapping
/// the resulting claims into a [`WorkerPrincipal`]. Any state carrying
/// a shared [`CognitoVerifier`] via [`FromRef`] can use this extractor.
impl<S> FromRequestParts<S> for WorkerPrincipal
where
    S: Send + Sync,
    Arc<CognitoVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<CognitoVerifier>::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;

        let claims = verifier.verify(token).await?;
        claims.into_principal()
    }
}

/// Extracts and verifies the `Authorization: Bearer` header without
/// requiring `workers` group membership, for the user-facing service.
impl<S> FromRequestParts<S> for UserPrincipal
where
    S: Send + Sync,
    Arc<CognitoVerifier>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<CognitoVerifier>::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::MissingToken)?;

        let claims = verifier.verify(token).await?;
        Ok(claims.into_user_principal())
    }
}

/// Extracts and checks the `x-api-key` header against the configured
/// shared secret, gating the two internal endpoints.
pub struct ApiKeyAuth;

impl<S> FromRequestParts<S> for ApiKeyAuth
where
    S: Send + Sync,
    Arc<str>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = Arc::<str>::from_ref(state);
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::InvalidApiKey)?;
        if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            return Err(AuthError::InvalidApiKey);
        }
        Ok(ApiKeyAuth)
    }
}

/// Byte-for-byte comparison that always inspects every byte of the
/// longer input, so a mismatched length or an early differing byte
/// doesn't return faster than a full match would.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len_matches = a.len() == b.len();
    let longest = a.len().max(b.len());
    let mut diff: u8 = if len_matches { 0 } else { 1 };
    for i in 0..longest {
        diff |= a.get(i).unwrap_or(&0) ^ b.get(i).unwrap_or(&0);
    }
    diff == 0
}

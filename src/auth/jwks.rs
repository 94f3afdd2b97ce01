use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::claims::WorkerClaims;
use super::error::AuthError;
use crate::config::CognitoConfig;

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Verifies Cognito-issued access tokens against the user pool's public
/// keys, fetched once and cached for the process lifetime (the keys are
/// effectively static; Cognito rotates them on a schedule far longer
/// than any deployment's uptime).
pub struct CognitoVerifier {
    http: reqwest::Client,
    jwks_url: String,
    expected_issuer: String,
    keys: RwLock<Option<Arc<HashMap<String, DecodingKey>>>>,
}

impl CognitoVerifier {
    pub fn new(config: &CognitoConfig) -> Self {
        let issuer = format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            config.region, config.user_pool_id
        );
        Self::with_issuer(issuer)
    }

    /// Builds a verifier against an arbitrary issuer, fetching keys from
    /// `{issuer}/.well-known/jwks.json`. Used in tests to point at a
    /// locally-served key set instead of a real Cognito user pool.
    pub fn with_issuer(issuer: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: format!("{issuer}/.well-known/jwks.json"),
            expected_issuer: issuer,
            keys: RwLock::new(None),
        }
    }

    async fn decoding_keys(&self) -> Result<Arc<HashMap<String, DecodingKey>>, AuthError> {
        if let Some(cached) = self.keys.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let jwk_set: JwkSet = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|err| AuthError::Jwks(err.to_string()))?
            .json()
            .await
            .map_err(|err| AuthError::Jwks(err.to_string()))?;

        let mut map = HashMap::new();
        for jwk in jwk_set.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|err| AuthError::Jwks(err.to_string()))?;
            map.insert(jwk.kid, key);
        }
        let map = Arc::new(map);
        *self.keys.write().await = Some(map.clone());
        Ok(map)
    }

    pub async fn verify(&self, token: &str) -> Result<WorkerClaims, AuthError> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidToken(err.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token missing kid".to_string()))?;

        let keys = self.decoding_keys().await?;
        let key = keys
            .get(&kid)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key '{kid}'")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.expected_issuer]);
        validation.validate_aud = false;

        let decoded = decode::<WorkerClaims>(token, key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
        Ok(decoded.claims)
    }
}

use serde::Deserialize;

use crate::domain::Environment;

use super::error::AuthError;

/// Claims carried by the identity provider's JWT, restricted to the
/// fields this system reads. Cognito access tokens carry the group
/// membership under `cognito:groups`; `username` is the worker hostname.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerClaims {
    pub username: String,
    #[serde(rename = "cognito:groups", default)]
    pub cognito_groups: Vec<String>,
}

/// The authenticated worker, derived from verified claims: hostname
/// (used as the lease identifier) plus the environment the caller's
/// group membership implies.
#[derive(Debug, Clone)]
pub struct WorkerPrincipal {
    pub hostname: String,
    pub environment: Environment,
}

impl WorkerClaims {
    /// Validates group membership and the `;`-free hostname invariant,
    /// then derives the principal's environment from group membership
    /// (`cloud` ⇒ cloud, else local).
    pub fn into_principal(self) -> Result<WorkerPrincipal, AuthError> {
        if !self.cognito_groups.iter().any(|g| g == "workers") {
            return Err(AuthError::NotAWorker);
        }
        if self.username.contains(';') {
            return Err(AuthError::InvalidHostname(self.username));
        }
        let environment = if self.cognito_groups.iter().any(|g| g == "cloud") {
            Environment::Cloud
        } else {
            Environment::Local
        };
        Ok(WorkerPrincipal { hostname: self.username, environment })
    }
}

/// The authenticated submitter. Unlike [`WorkerPrincipal`], membership
/// in a particular group is not required — any holder of a valid token
/// from the same identity provider may submit work.
#[derive(Debug, Clone)]
pub struct UserPrincipal {
    pub username: String,
}

impl WorkerClaims {
    pub fn into_user_principal(self) -> UserPrincipal {
        UserPrincipal { username: self.username }
    }
}

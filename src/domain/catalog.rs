use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Schema for one permitted environment-variable key on an entrypoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvVarSpec {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entrypoint {
    pub name: String,
    pub image_url: String,
    pub cmd: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVarSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub name: String,
    pub entrypoints: Vec<Entrypoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub name: String,
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// The closed, build-time-provisioned application/version/entrypoint
/// catalog the Submit API validates submissions against. Loaded once
/// at startup; there is no runtime registration endpoint.
#[derive(Debug, Clone)]
pub struct Catalog {
    entrypoints: HashMap<(String, String, String), Entrypoint>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unknown application/version/entrypoint: {0}/{1}/{2}")]
    UnknownEntrypoint(String, String, String),

    #[error("environment variable '{0}' is not permitted for this entrypoint")]
    UnknownEnvVar(String),

    #[error("required environment variable '{0}' was not supplied and has no default")]
    MissingRequiredEnvVar(String),
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_yaml::from_str(raw)?;
        let mut entrypoints = HashMap::new();
        for app in doc.applications {
            for version in app.versions {
                for entrypoint in version.entrypoints {
                    entrypoints.insert(
                        (app.name.clone(), version.name.clone(), entrypoint.name.clone()),
                        entrypoint,
                    );
                }
            }
        }
        Ok(Self { entrypoints })
    }

    pub fn lookup(
        &self,
        application: &str,
        version: &str,
        entrypoint: &str,
    ) -> Result<&Entrypoint, CatalogError> {
        self.entrypoints
            .get(&(application.to_string(), version.to_string(), entrypoint.to_string()))
            .ok_or_else(|| {
                CatalogError::UnknownEntrypoint(
                    application.to_string(),
                    version.to_string(),
                    entrypoint.to_string(),
                )
            })
    }

    /// Validate caller-supplied environment-variable overrides against an
    /// entrypoint's schema and return the fully-resolved map (required
    /// keys present, defaults filled in for the rest).
    pub fn resolve_env(
        entrypoint: &Entrypoint,
        overrides: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, CatalogError> {
        let allowed: HashMap<&str, &EnvVarSpec> =
            entrypoint.env.iter().map(|spec| (spec.name.as_str(), spec)).collect();

        for key in overrides.keys() {
            if !allowed.contains_key(key.as_str()) {
                return Err(CatalogError::UnknownEnvVar(key.clone()));
            }
        }

        let mut resolved = HashMap::new();
        for spec in &entrypoint.env {
            if let Some(value) = overrides.get(&spec.name) {
                resolved.insert(spec.name.clone(), value.clone());
            } else if let Some(default) = &spec.default {
                resolved.insert(spec.name.clone(), default.clone());
            } else if spec.required {
                return Err(CatalogError::MissingRequiredEnvVar(spec.name.clone()));
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
applications:
  - name: denoiser
    versions:
      - name: "1.0"
        entrypoints:
          - name: default
            image_url: registry/denoiser:1.0
            cmd: ["python", "run.py"]
            env:
              - name: THRESHOLD
                required: false
                default: "0.5"
              - name: MODE
                required: true
"#;

    #[test]
    fn looks_up_known_entrypoint() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        let entrypoint = catalog.lookup("denoiser", "1.0", "default").unwrap();
        assert_eq!(entrypoint.image_url, "registry/denoiser:1.0");
    }

    #[test]
    fn unknown_triple_is_rejected() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        assert!(catalog.lookup("denoiser", "2.0", "default").is_err());
    }

    #[test]
    fn unknown_env_var_is_rejected() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        let entrypoint = catalog.lookup("denoiser", "1.0", "default").unwrap();
        let mut overrides = HashMap::new();
        overrides.insert("BOGUS".to_string(), "x".to_string());
        let err = Catalog::resolve_env(entrypoint, &overrides).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownEnvVar(_)));
    }

    #[test]
    fn missing_required_env_var_is_rejected() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        let entrypoint = catalog.lookup("denoiser", "1.0", "default").unwrap();
        let err = Catalog::resolve_env(entrypoint, &HashMap::new()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingRequiredEnvVar(_)));
    }

    #[test]
    fn defaults_and_overrides_resolve() {
        let catalog = Catalog::from_yaml(SAMPLE).unwrap();
        let entrypoint = catalog.lookup("denoiser", "1.0", "default").unwrap();
        let mut overrides = HashMap::new();
        overrides.insert("MODE".to_string(), "fast".to_string());
        let resolved = Catalog::resolve_env(entrypoint, &overrides).unwrap();
        assert_eq!(resolved.get("THRESHOLD").unwrap(), "0.5");
        assert_eq!(resolved.get("MODE").unwrap(), "fast");
    }
}

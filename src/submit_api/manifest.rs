//! Resolves a submitter's logical input ids into the `{local_path:
//! source_URI}` download manifest a worker fetches from directly.
//!
//! Rather than trusting a caller-supplied file list,
//! each input id names a subtree under the submitter's own root that is
//! walked recursively, so the manifest always reflects what is actually
//! on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{Config, FilesystemProvider};

use super::error::SubmitApiError;

fn scoped(root: &Path, rel: &str) -> Result<PathBuf, SubmitApiError> {
    let candidate = root.join(rel.trim_start_matches('/'));
    let normalized = normalize(&candidate);
    if !normalized.starts_with(root) {
        return Err(SubmitApiError::Validation(format!(
            "input path escapes user root: {rel}"
        )));
    }
    Ok(normalized)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn source_uri(config: &Config, absolute_path: &Path) -> String {
    match config.filesystem {
        FilesystemProvider::Local => format!("file://{}", absolute_path.display()),
        FilesystemProvider::S3 => {
            let bucket = config.s3.as_ref().map(|s3| s3.bucket.as_str()).unwrap_or_default();
            let key = absolute_path
                .strip_prefix(&config.user_data_root_path)
                .unwrap_or(absolute_path)
                .display();
            format!("s3://{bucket}/{key}")
        }
    }
}

async fn walk(
    base: &Path,
    dir: &Path,
    local_prefix: &str,
    config: &Config,
    out: &mut HashMap<String, String>,
) -> Result<(), SubmitApiError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            Box::pin(walk(base, &path, local_prefix, config, out)).await?;
        } else {
            let relative = path.strip_prefix(base).unwrap_or(&path);
            out.insert(format!("{local_prefix}/{}", relative.display()), source_uri(config, &path));
        }
    }
    Ok(())
}

/// Enumerates every file under `{user_data_root_path}/{username}/{rel_path}`,
/// mapping each to a container-local path rooted at `local_prefix`.
/// Single files are mapped directly without recursion.
pub async fn enumerate_source(
    config: &Config,
    username: &str,
    rel_path: &str,
    local_prefix: &str,
) -> Result<HashMap<String, String>, SubmitApiError> {
    let user_root = config.user_data_root_path.join(username);
    let source_root = scoped(&user_root, rel_path)?;

    let metadata = tokio::fs::metadata(&source_root).await.map_err(|_| {
        SubmitApiError::NotFound(format!("input path does not exist: {rel_path}"))
    })?;

    let mut out = HashMap::new();
    if metadata.is_file() {
        out.insert(local_prefix.to_string(), source_uri(config, &source_root));
        return Ok(out);
    }

    walk(&source_root, &source_root, local_prefix, config, &mut out).await?;
    Ok(out)
}

/// Where a job's three output classes should be written, rooted at the
/// submitter's own output tree rather than their input tree.
pub fn output_paths(config: &Config, username: &str, job_id: &str) -> crate::domain::PathsUpload {
    let root = config.user_data_root_path.join(username).join("output").join(job_id);
    crate::domain::PathsUpload {
        output: source_uri(config, &root.join("output")),
        log: source_uri(config, &root.join("log")),
        artifact: source_uri(config, &root.join("artifact")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CognitoConfig;

    fn test_config(root: PathBuf) -> Config {
        Config {
            filesystem: FilesystemProvider::Local,
            s3: None,
            user_data_root_path: root,
            queue_db_url: "sqlite://:memory:".to_string(),
            max_retries: 2,
            timeout_failure_secs: 300,
            retry_different: true,
            userfacing_api_url: "http://submit-api.internal".to_string(),
            internal_api_key: "secret".to_string(),
            worker_api_url: "http://worker-api.internal".to_string(),
            catalog_path: PathBuf::from("/etc/jobbroker/catalog.yaml"),
            cognito: CognitoConfig {
                user_pool_id: "pool".to_string(),
                client_id: "client".to_string(),
                region: "us-east-1".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn enumerates_nested_files_under_local_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        let user_dir = tmp.path().join("alice").join("data").join("set1");
        tokio::fs::create_dir_all(&user_dir).await.unwrap();
        tokio::fs::write(user_dir.join("a.csv"), b"x").await.unwrap();
        tokio::fs::create_dir_all(user_dir.join("nested")).await.unwrap();
        tokio::fs::write(user_dir.join("nested").join("b.csv"), b"y").await.unwrap();

        let config = test_config(tmp.path().to_path_buf());
        let manifest = enumerate_source(&config, "alice", "data/set1", "data").await.unwrap();

        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains_key("data/a.csv"));
        assert!(manifest.contains_key("data/nested/b.csv"));
    }

    #[tokio::test]
    async fn rejects_ids_that_escape_the_user_root() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(tmp.path().join("alice")).await.unwrap();
        let config = test_config(tmp.path().to_path_buf());
        let err = enumerate_source(&config, "alice", "../bob/secret", "data").await.unwrap_err();
        assert!(matches!(err, SubmitApiError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_input_id_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(tmp.path().join("alice")).await.unwrap();
        let config = test_config(tmp.path().to_path_buf());
        let err = enumerate_source(&config, "alice", "data/missing", "data").await.unwrap_err();
        assert!(matches!(err, SubmitApiError::NotFound(_)));
    }
}

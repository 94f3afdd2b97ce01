use std::path::{Path, PathBuf};

use regex::Regex;

use super::error::StorageError;
use super::FileHTTPRequest;

/// Direct-filesystem backend, rooted at a configured read/write root.
/// Path-scoping (no escaping the root) is the only authorization this
/// performs.
pub struct LocalBroker {
    root: PathBuf,
}

impl LocalBroker {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves a caller-supplied relative path against the root,
    /// rejecting anything that escapes it.
    fn scoped_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let candidate = self.root.join(path.trim_start_matches('/'));
        let normalized = normalize(&candidate);
        if !normalized.starts_with(&self.root) {
            return Err(StorageError::PermissionDenied(format!(
                "path escapes read root: {path}"
            )));
        }
        Ok(normalized)
    }

    pub async fn get_file(&self, path: &str) -> Result<tokio::fs::File, StorageError> {
        let resolved = self.scoped_path(path)?;
        tokio::fs::File::open(&resolved).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(path.to_string())
            } else {
                StorageError::Io(err)
            }
        })
    }

    /// Rewrites `request_url` by replacing the *terminal* occurrence of
    /// `url_suffix` with `download_suffix`, using an anchored regex so a
    /// path that happens to contain the literal suffix elsewhere is left
    /// untouched.
    pub fn get_file_url(
        &self,
        path: &str,
        request_url: &str,
        url_suffix: &str,
        download_suffix: &str,
        auth_header: Option<&str>,
    ) -> Result<FileHTTPRequest, StorageError> {
        let resolved = self.scoped_path(path)?;
        if !resolved.exists() {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let rewritten = replace_terminal(request_url, url_suffix, download_suffix)?;

        let mut headers = std::collections::HashMap::new();
        if let Some(auth) = auth_header {
            headers.insert("Authorization".to_string(), auth.to_string());
        }

        Ok(FileHTTPRequest {
            method: "GET".to_string(),
            url: rewritten,
            headers,
            data: std::collections::HashMap::new(),
        })
    }

    pub async fn post_file(&self, path: &str, body: &[u8]) -> Result<(), StorageError> {
        let resolved = self.scoped_path(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, body).await?;
        Ok(())
    }

    pub fn post_file_url(
        &self,
        path: &str,
        request_url: &str,
        url_suffix: &str,
        upload_suffix: &str,
    ) -> Result<FileHTTPRequest, StorageError> {
        self.scoped_path(path)?;
        let rewritten = replace_terminal(request_url, url_suffix, upload_suffix)?;
        Ok(FileHTTPRequest {
            method: "POST".to_string(),
            url: rewritten,
            headers: std::collections::HashMap::new(),
            data: std::collections::HashMap::new(),
        })
    }
}

fn replace_terminal(url: &str, suffix: &str, replacement: &str) -> Result<String, StorageError> {
    let pattern = format!("{}$", regex::escape(suffix));
    let re = Regex::new(&pattern)
        .map_err(|err| StorageError::PermissionDenied(format!("invalid url suffix: {err}")))?;
    if !re.is_match(url) {
        return Err(StorageError::PermissionDenied(format!(
            "request url does not end with expected suffix '{suffix}'"
        )));
    }
    Ok(re.replace(url, replacement).into_owned())
}

/// Lexical `..`/`.` resolution without touching the filesystem (the
/// path need not exist yet, e.g. for uploads).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_paths_that_escape_the_root() {
        let broker = LocalBroker::new(PathBuf::from("/data/users/alice"));
        let err = broker.get_file("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied(_)));
    }

    #[test]
    fn replaces_only_terminal_url_suffix() {
        let rewritten =
            replace_terminal("https://host/files/report-url/url", "/url", "/download").unwrap();
        assert_eq!(rewritten, "https://host/files/report-url/download");
    }

    #[test]
    fn rejects_url_without_expected_suffix() {
        let err = replace_terminal("https://host/files/other", "/url", "/download").unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied(_)));
    }
}

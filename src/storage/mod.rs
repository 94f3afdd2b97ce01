//! The FileBroker: translates a logical object-store path into either a
//! direct response or a signed request the worker issues itself.
//! Closed, two-implementation polymorphism — local disk or S3 — selected
//! once at startup from configuration, not an open extension point.

mod error;
mod local;
mod s3;
mod sigv4;

pub use error::StorageError;
pub use local::LocalBroker;
pub use s3::S3Broker;
pub use sigv4::Credentials;

use std::collections::HashMap;

use crate::config::{Config, FilesystemProvider};

/// A request the caller (worker) should issue itself: either a direct
/// streamed download/upload already authorized by this process, or a
/// signed URL with whatever extra form fields a presigned POST needs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileHTTPRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub data: HashMap<String, String>,
}

/// An object-store location: either rooted under the local data root,
/// or an `s3://bucket/key` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUri {
    Local(String),
    S3 { bucket: String, key: String },
}

impl StorageUri {
    /// Parses either a bare local-relative path or an `s3://` URI.
    /// `s3://` URIs are parsed with the `url` crate so the usual
    /// authority/path rules (and percent-decoding) apply; the bucket is
    /// taken from the host component and the key from the remaining path.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        if let Some(rest) = raw.strip_prefix("s3://") {
            let full = format!("s3://{rest}");
            let parsed = url::Url::parse(&full)
                .map_err(|err| StorageError::PermissionDenied(format!("invalid s3 uri: {err}")))?;
            let bucket = parsed
                .host_str()
                .ok_or_else(|| StorageError::PermissionDenied("s3 uri missing bucket".to_string()))?
                .to_string();
            let key = parsed.path().trim_start_matches('/').to_string();
            Ok(StorageUri::S3 { bucket, key })
        } else {
            Ok(StorageUri::Local(raw.to_string()))
        }
    }
}

pub enum FileBroker {
    Local(LocalBroker),
    S3(S3Broker),
}

impl FileBroker {
    /// Builds the configured backend. S3 credentials are read from the
    /// standard `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY` variables
    /// rather than the application's own flat config, since they follow
    /// AWS SDK convention rather than this system's own contract.
    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        match config.filesystem {
            FilesystemProvider::Local => {
                Ok(FileBroker::Local(LocalBroker::new(config.user_data_root_path.clone())))
            }
            FilesystemProvider::S3 => {
                let s3_config = config.s3.as_ref().ok_or_else(|| {
                    StorageError::PermissionDenied("s3 filesystem selected with no s3 config".to_string())
                })?;
                let access_key = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
                    StorageError::PermissionDenied("AWS_ACCESS_KEY_ID is not set".to_string())
                })?;
                let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
                    StorageError::PermissionDenied("AWS_SECRET_ACCESS_KEY is not set".to_string())
                })?;
                let endpoint = format!("https://s3.{}.amazonaws.com", s3_config.region);

                let sdk_credentials = aws_sdk_s3::config::Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "jobbroker-config",
                );
                let sdk_config = aws_sdk_s3::Config::builder()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(aws_sdk_s3::config::Region::new(s3_config.region.clone()))
                    .endpoint_url(&endpoint)
                    .credentials_provider(sdk_credentials)
                    .build();
                let client = aws_sdk_s3::Client::from_conf(sdk_config);

                Ok(FileBroker::S3(S3Broker::new(
                    client,
                    Credentials { access_key, secret_key },
                    s3_config.region.clone(),
                    endpoint,
                    s3_config.bucket.clone(),
                )))
            }
        }
    }

    /// Validates that a storage URI is legal for the configured backend,
    /// rejecting `s3://` URIs whose bucket differs from the configured
    /// one.
    pub fn validate_uri(&self, uri: &StorageUri) -> Result<(), StorageError> {
        match (self, uri) {
            (FileBroker::Local(_), StorageUri::Local(_)) => Ok(()),
            (FileBroker::S3(broker), StorageUri::S3 { bucket, .. }) => broker.check_bucket(bucket),
            _ => Err(StorageError::PermissionDenied(
                "storage uri scheme does not match the configured backend".to_string(),
            )),
        }
    }

    pub async fn post_file(&self, path: &str, body: &[u8]) -> Result<(), StorageError> {
        match self {
            FileBroker::Local(broker) => broker.post_file(path, body).await,
            FileBroker::S3(broker) => broker.post_file(path, body).await,
        }
    }

    pub fn post_file_url(
        &self,
        uri: &StorageUri,
        request_url: &str,
        url_suffix: &str,
        upload_suffix: &str,
    ) -> Result<FileHTTPRequest, StorageError> {
        match (self, uri) {
            (FileBroker::Local(broker), StorageUri::Local(path)) => {
                broker.post_file_url(path, request_url, url_suffix, upload_suffix)
            }
            (FileBroker::S3(broker), StorageUri::S3 { bucket, key }) => {
                broker.post_file_url(bucket, key)
            }
            _ => Err(StorageError::PermissionDenied(
                "storage uri scheme does not match the configured backend".to_string(),
            )),
        }
    }

    pub async fn get_file_url(
        &self,
        uri: &StorageUri,
        request_url: &str,
        url_suffix: &str,
        download_suffix: &str,
        auth_header: Option<&str>,
    ) -> Result<FileHTTPRequest, StorageError> {
        match (self, uri) {
            (FileBroker::Local(broker), StorageUri::Local(path)) => {
                broker.get_file_url(path, request_url, url_suffix, download_suffix, auth_header)
            }
            (FileBroker::S3(broker), StorageUri::S3 { bucket, key }) => {
                broker.get_file_url(bucket, key).await
            }
            _ => Err(StorageError::PermissionDenied(
                "storage uri scheme does not match the configured backend".to_string(),
            )),
        }
    }
}

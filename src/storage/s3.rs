use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;

use super::error::StorageError;
use super::sigv4::{Credentials, SigV4Signer};
use super::FileHTTPRequest;

const GET_EXPIRY: Duration = Duration::from_secs(600);
const POST_EXPIRY: Duration = Duration::from_secs(600);

/// S3-backed broker. Never performs I/O itself — every operation hands
/// back a presigned request for the worker to issue directly against
/// S3. Direct read/write through this process is not supported; the
/// backend never proxies file bytes for S3 either. Presigned GETs go
/// through `aws-sdk-s3`; presigned POSTs are still hand-rolled, since
/// a conditions-scoped POST policy has no equivalent in the SDK.
pub struct S3Broker {
    client: aws_sdk_s3::Client,
    signer: SigV4Signer,
    endpoint: String,
    bucket: String,
}

impl S3Broker {
    pub fn new(client: aws_sdk_s3::Client, credentials: Credentials, region: String, endpoint: String, bucket: String) -> Self {
        Self {
            client,
            signer: SigV4Signer::new(credentials, region),
            endpoint,
            bucket,
        }
    }

    pub async fn get_file(&self, _path: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::PermissionDenied(
            "direct reads are not supported against the s3 backend; use get_file_url".to_string(),
        ))
    }

    pub async fn get_file_url(&self, bucket: &str, key: &str) -> Result<FileHTTPRequest, StorageError> {
        self.check_bucket(bucket)?;
        let presigning = PresigningConfig::expires_in(GET_EXPIRY)
            .map_err(|err| StorageError::PermissionDenied(format!("invalid presigning config: {err}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::PermissionDenied(format!("failed to presign get: {err}")))?;
        Ok(FileHTTPRequest {
            method: "GET".to_string(),
            url: presigned.uri().to_string(),
            headers: std::collections::HashMap::new(),
            data: std::collections::HashMap::new(),
        })
    }

    pub async fn post_file(&self, _path: &str, _body: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::PermissionDenied(
            "direct writes are not supported against the s3 backend; use post_file_url".to_string(),
        ))
    }

    pub fn post_file_url(
        &self,
        bucket: &str,
        key_prefix: &str,
    ) -> Result<FileHTTPRequest, StorageError> {
        self.check_bucket(bucket)?;
        let now = chrono::Utc::now();
        let post = self
            .signer
            .presign_post(&self.endpoint, &self.bucket, key_prefix, POST_EXPIRY, now);
        let mut data = std::collections::HashMap::new();
        for (k, v) in post.fields {
            data.insert(k, v);
        }
        Ok(FileHTTPRequest {
            method: "POST".to_string(),
            url: post.url,
            headers: std::collections::HashMap::new(),
            data,
        })
    }

    pub(crate) fn check_bucket(&self, requested: &str) -> Result<(), StorageError> {
        if requested != self.bucket {
            return Err(StorageError::PermissionDenied(format!(
                "bucket '{requested}' does not match configured bucket '{}'",
                self.bucket
            )));
        }
        Ok(())
    }
}

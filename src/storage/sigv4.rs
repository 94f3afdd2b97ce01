//! Hand-rolled AWS SigV4 request signing for presigned POST policies.
//!
//! Presigned GETs are generated through `aws-sdk-s3` (see
//! `storage::s3`); POST still needs its own signing because a
//! conditions-scoped upload policy (`starts-with $key`) has no
//! equivalent in the SDK's presigning API, so that half is implemented
//! directly from the public SigV4 algorithm (see DESIGN.md).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

pub struct SigV4Signer {
    pub credentials: Credentials,
    pub region: String,
}

const SERVICE: &str = "s3";

impl SigV4Signer {
    pub fn new(credentials: Credentials, region: String) -> Self {
        Self { credentials, region }
    }

    fn scope_date(&self, now: DateTime<Utc>) -> String {
        now.format("%Y%m%d").to_string()
    }

    fn credential_scope(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.scope_date(now),
            self.region,
            SERVICE
        )
    }

    fn signing_key(&self, now: DateTime<Utc>) -> Vec<u8> {
        let date_key = hmac_sha256(
            format!("AWS4{}", self.credentials.secret_key).as_bytes(),
            self.scope_date(now).as_bytes(),
        );
        let region_key = hmac_sha256(&date_key, self.region.as_bytes());
        let service_key = hmac_sha256(&region_key, SERVICE.as_bytes());
        hmac_sha256(&service_key, b"aws4_request")
    }

    /// Presigned POST policy, constrained with `starts-with $key` so
    /// the credential only authorizes writes under `key_prefix`.
    pub fn presign_post(
        &self,
        endpoint: &str,
        bucket: &str,
        key_prefix: &str,
        expires: std::time::Duration,
        now: DateTime<Utc>,
    ) -> PresignedPost {
        let expiration = (now + chrono::Duration::seconds(expires.as_secs() as i64))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let credential = format!(
            "{}/{}",
            self.credentials.access_key,
            self.credential_scope(now)
        );
        let amz_date_value = amz_date(now);

        let policy_document = serde_json::json!({
            "expiration": expiration,
            "conditions": [
                {"bucket": bucket},
                ["starts-with", "$key", key_prefix],
                {"x-amz-algorithm": "AWS4-HMAC-SHA256"},
                {"x-amz-credential": credential},
                {"x-amz-date": amz_date_value},
            ]
        });
        let policy_base64 = {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(policy_document.to_string())
        };

        let signature = hex::encode(hmac_sha256(&self.signing_key(now), policy_base64.as_bytes()));

        let mut fields = std::collections::HashMap::new();
        fields.insert("key".to_string(), format!("{key_prefix}${{filename}}"));
        fields.insert("x-amz-algorithm".to_string(), "AWS4-HMAC-SHA256".to_string());
        fields.insert("x-amz-credential".to_string(), credential);
        fields.insert("x-amz-date".to_string(), amz_date_value);
        fields.insert("policy".to_string(), policy_base64);
        fields.insert("x-amz-signature".to_string(), signature);

        PresignedPost {
            url: format!("{endpoint}/{bucket}"),
            fields,
        }
    }
}

pub struct PresignedPost {
    pub url: String,
    pub fields: std::collections::HashMap<String, String>,
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

mod hex {
    pub fn encode(bytes: Vec<u8>) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

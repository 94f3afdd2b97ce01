//! Shared fixtures for the integration tests: a config pointed at a
//! tempdir, an in-memory queue, and a local mock identity provider that
//! serves its own JWKS document so `WorkerPrincipal`/`UserPrincipal`
//! extraction can be exercised without reaching real Cognito.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use jobbroker::auth::CognitoVerifier;
use jobbroker::config::{CognitoConfig, Config, FilesystemProvider};
use jobbroker::observability::Metrics;
use jobbroker::queue::JobQueue;
use jobbroker::storage::FileBroker;
use jobbroker::tracker::JobTracker;
use jobbroker::worker_api::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tokio::net::TcpListener;

// A 2048-bit RSA test keypair, used only to sign/verify tokens in this
// test suite. Never used for anything reachable outside this process.
const TEST_KEY_PEM: &str = include_str!("test_key.pem");
const TEST_KID: &str = "test-key-1";
const TEST_N: &str = "lNMO17lW-9iPJu9nnoCF9Sji2qHfYnSbEn_omDfHKgenr3JiiDVzWdZZJcPr8sxkpgx1MaM8W6C-Z_C2xXeL3E1CdcciQT0UB3PaskysyMnEhk_2Xw7H9rgaO2z-y3XUC4n4yC7RX0N1l_rg-FyAdJ8NXya_npctarAT1URXFz-CxjGmpVOIg9ldpd01SonnGBYvTjoNwfJco3FMbzAzu4dpcvFaIn3_aEB2Xh8azQInZQ_UVq_wIUcEEpt7VwitGh327y-QHtGif-oqqwUCwoCosxe27hDEJopo8oy4dZ3k-GmV5hHSpFPOd-GVgiN_Rb4CSLJ-pZMtx3b2kN0BCw";
const TEST_E: &str = "AQAB";

/// Binds a tiny axum server serving a single-key JWKS document and
/// returns its base URL, to be used as the verifier's issuer.
pub async fn spawn_mock_issuer() -> String {
    async fn jwks() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "keys": [{
                "kid": TEST_KID,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": TEST_N,
                "e": TEST_E,
            }]
        }))
    }

    let app = Router::new().route("/.well-known/jwks.json", get(jwks));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[derive(Serialize)]
struct SignedClaims<'a> {
    username: &'a str,
    #[serde(rename = "cognito:groups")]
    cognito_groups: &'a [&'a str],
    iss: &'a str,
    exp: u64,
}

/// Signs a token against the bundled test key, claiming the given
/// username and group memberships, for an issuer matching
/// [`spawn_mock_issuer`]'s returned base URL.
pub fn sign_token(issuer: &str, username: &str, groups: &[&str]) -> String {
    let claims = SignedClaims {
        username,
        cognito_groups: groups,
        iss: issuer,
        exp: 9_999_999_999,
    };
    let mut header = Header::new(jsonwebtoken::Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

pub fn test_config(root: std::path::PathBuf, worker_api_url: String) -> Config {
    Config {
        filesystem: FilesystemProvider::Local,
        s3: None,
        user_data_root_path: root,
        queue_db_url: ":memory:".to_string(),
        max_retries: 2,
        timeout_failure_secs: 300,
        retry_different: true,
        userfacing_api_url: "http://submit-api.invalid".to_string(),
        internal_api_key: "test-internal-key".to_string(),
        worker_api_url,
        catalog_path: std::path::PathBuf::from("/nonexistent/catalog.yaml"),
        cognito: CognitoConfig {
            user_pool_id: "pool".to_string(),
            client_id: "client".to_string(),
            region: "us-east-1".to_string(),
        },
    }
}

/// Assembles a worker API `AppState` with an in-memory queue and a
/// local-disk broker rooted at `data_root`, plus a [`CognitoVerifier`]
/// pointed at the given mock issuer.
pub async fn build_worker_state(data_root: std::path::PathBuf, issuer: String) -> AppState {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let tracker = Arc::new(JobTracker::new("http://127.0.0.1:0".to_string(), "test-internal-key".to_string()));
    let queue = Arc::new(JobQueue::new(conn, tracker, true));
    queue.create(false).await.unwrap();

    let config = test_config(data_root, "http://127.0.0.1:0".to_string());
    let storage = Arc::new(FileBroker::from_config(&config).unwrap());
    let cognito = Arc::new(CognitoVerifier::with_issuer(issuer));

    AppState {
        internal_api_key: Arc::from(config.internal_api_key.as_str()),
        config: Arc::new(config),
        queue,
        storage,
        cognito,
        metrics: Arc::new(Metrics::new()),
    }
}

pub fn sample_job(job_id: &str) -> serde_json::Value {
    serde_json::json!({
        "job": {
            "app": {"cmd": ["run.sh"], "env": {}},
            "handler": {
                "image_url": "registry/app:1",
                "files_download": {},
                "files_upload": {}
            },
            "meta": {"job_id": job_id, "date_created": chrono::Utc::now().to_rfc3339()},
            "hardware": {}
        },
        "environment": "local",
        "priority": 5,
        "paths_upload": {"output": "output", "log": "log", "artifact": "artifact"}
    })
}

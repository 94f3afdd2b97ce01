//! Drives the worker API's axum `Router` in-process, end to end: a job
//! enters through the internal `POST /_jobs` endpoint gated by the
//! shared API key, a worker authenticated with a Cognito-shaped JWT
//! pulls it off `GET /jobs`, and reports completion through
//! `PUT /jobs/{id}/status`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use jobbroker::worker_api;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn full_dispatch_round_trip_through_http_layer() {
    let data_root = tempfile::tempdir().unwrap();
    let issuer = common::spawn_mock_issuer().await;
    let state = common::build_worker_state(data_root.path().to_path_buf(), issuer.clone()).await;
    let app = worker_api::router(state);

    let submit = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_jobs")
                .header("content-type", "application/json")
                .header("x-api-key", "test-internal-key")
                .body(Body::from(serde_json::to_vec(&common::sample_job("job-1")).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::CREATED);
    let submitted = body_json(submit).await;
    let job_id = submitted["job"]["meta"]["job_id"].as_str().unwrap().to_string();
    assert_eq!(job_id, "job-1");

    let worker_token = common::sign_token(&issuer, "worker-host-1", &["workers"]);

    let dequeue = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/jobs?memory=4096")
                .header("authorization", format!("Bearer {worker_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(dequeue.status(), StatusCode::OK);
    let dequeued = body_json(dequeue).await;
    let jobs = dequeued.as_object().unwrap();
    assert_eq!(jobs.len(), 1);
    let (id, _) = jobs.iter().next().unwrap();
    let id: i64 = id.parse().unwrap();

    // A second worker pulling the same environment gets nothing: the
    // job is already leased.
    let second_pull = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/jobs?memory=4096")
                .header("authorization", format!("Bearer {worker_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let second = body_json(second_pull).await;
    assert!(second.as_object().unwrap().is_empty());

    let report_running = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/jobs/{id}/status"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {worker_token}"))
                .body(Body::from(serde_json::to_vec(&serde_json::json!({"status": "running"})).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(report_running.status(), StatusCode::NO_CONTENT);

    let report_finished = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/jobs/{id}/status"))
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {worker_token}"))
                .body(Body::from(
                    serde_json::to_vec(&serde_json::json!({"status": "finished"})).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(report_finished.status(), StatusCode::NO_CONTENT);

    let status = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/jobs/{id}/status"))
                .header("authorization", format!("Bearer {worker_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let status_body = body_json(status).await;
    assert_eq!(status_body, "finished");
}

#[tokio::test]
async fn internal_endpoint_rejects_wrong_api_key() {
    let data_root = tempfile::tempdir().unwrap();
    let issuer = common::spawn_mock_issuer().await;
    let state = common::build_worker_state(data_root.path().to_path_buf(), issuer).await;
    let app = worker_api::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_jobs")
                .header("content-type", "application/json")
                .header("x-api-key", "wrong-key")
                .body(Body::from(serde_json::to_vec(&common::sample_job("job-2")).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn worker_endpoint_rejects_non_worker_group() {
    let data_root = tempfile::tempdir().unwrap();
    let issuer = common::spawn_mock_issuer().await;
    let state = common::build_worker_state(data_root.path().to_path_buf(), issuer.clone()).await;
    let app = worker_api::router(state);

    let token = common::sign_token(&issuer, "some-user", &["humans"]);
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/jobs?memory=4096")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

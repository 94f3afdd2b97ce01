//! A job dispatched to a worker that goes silent is reclaimed by the
//! timeout sweep and becomes dispatchable to a different worker.

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
async fn stalled_lease_is_requeued_and_redispatched() {
    let data_root = tempfile::tempdir().unwrap();
    let issuer = common::spawn_mock_issuer().await;
    let state = common::build_worker_state(data_root.path().to_path_buf(), issuer.clone()).await;
    let queue = state.queue.clone();
    let app = worker_api::router(state);

    let submit = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_jobs")
                .header("content-type", "application/json")
                .header("x-api-key", "test-internal-key")
                .body(Body::from(serde_json::to_vec(&common::sample_job("stall-1")).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(submit.status(), StatusCode::CREATED);

    let first_worker_token = common::sign_token(&issuer, "worker-a", &["workers"]);
    let first_pull = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/jobs?memory=4096")
                .header("authorization", format!("Bearer {first_worker_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let dequeued = body_json(first_pull).await;
    let jobs = dequeued.as_object().unwrap();
    assert_eq!(jobs.len(), 1, "worker-a should have claimed the only job");

    // Simulate worker-a going silent: a negative timeout window puts
    // the cutoff strictly in the future, so the lease it just claimed
    // always looks stalled without needing to wait or backdate rows.
    let (requeued, failed) = queue.handle_timeouts(2, -1).await.unwrap();
    assert_eq!(requeued, 1);
    assert_eq!(failed, 0);

    let second_worker_token = common::sign_token(&issuer, "worker-b", &["workers"]);
    let second_pull = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/jobs?memory=4096")
                .header("authorization", format!("Bearer {second_worker_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let redispatched = body_json(second_pull).await;
    let jobs = redispatched.as_object().unwrap();
    assert_eq!(jobs.len(), 1, "worker-b should now be able to claim the requeued job");

    let (_, specs) = jobs.iter().next().unwrap();
    assert_eq!(specs["meta"]["job_id"], "stall-1");
}

#[tokio::test]
async fn exhausting_retries_fails_the_job_instead_of_requeuing() {
    let data_root = tempfile::tempdir().unwrap();
    let issuer = common::spawn_mock_issuer().await;
    let state = common::build_worker_state(data_root.path().to_path_buf(), issuer.clone()).await;
    let queue = state.queue.clone();
    let app = worker_api::router(state);

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_jobs")
                .header("content-type", "application/json")
                .header("x-api-key", "test-internal-key")
                .body(Body::from(serde_json::to_vec(&common::sample_job("exhaust-1")).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let worker_token = common::sign_token(&issuer, "worker-c", &["workers"]);
    app.clone()
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

    // max_retries of 0 means the very first stall sweep fails the job
    // outright instead of giving it another lap through the queue.
    let (requeued, failed) = queue.handle_timeouts(0, -1).await.unwrap();
    assert_eq!(requeued, 0);
    assert_eq!(failed, 1);

    let status = app
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
    let redispatch = body_json(status).await;
    assert!(
        redispatch.as_object().unwrap().is_empty(),
        "a failed job must never be handed out again"
    );
}

//! When the Submit API reports a submission as gone (404 on the status
//! callback), the JobQueue treats that as the submitter having deleted
//! the job and drops its row rather than leaving an orphaned lease.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use jobbroker::domain::{
    AppSpecs, Environment, HandlerSpecs, HardwareSpecs, JobFilter, JobSpecs, MetaSpecs, PathsUpload, SubmittedJob,
};
use jobbroker::queue::{JobQueue, QueueError};
use jobbroker::tracker::JobTracker;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<i64>>>);

async fn deleted_job_status(State(seen): State<Seen>, Json(body): Json<serde_json::Value>) -> StatusCode {
    seen.0.lock().unwrap().push(body["job_id"].as_i64().unwrap());
    StatusCode::NOT_FOUND
}

async fn spawn_mock_submit_api() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/_job_status", post(deleted_job_status))
        .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), seen)
}

fn sample_submission() -> SubmittedJob {
    SubmittedJob {
        job: JobSpecs {
            app: AppSpecs { cmd: vec!["run".into()], env: HashMap::new() },
            handler: HandlerSpecs {
                image_url: "img".into(),
                batch_job_definition: None,
                files_download: HashMap::new(),
                files_upload: HashMap::new(),
            },
            meta: MetaSpecs { job_id: "cancel-1".into(), date_created: chrono::Utc::now(), extra: HashMap::new() },
            hardware: HardwareSpecs::default(),
        },
        environment: Environment::Local,
        group: None,
        priority: 5,
        paths_upload: PathsUpload { output: "o".into(), log: "l".into(), artifact: "a".into() },
    }
}

#[tokio::test]
async fn status_update_deletes_row_when_submitter_reports_job_gone() {
    let (submit_api_url, seen) = spawn_mock_submit_api().await;

    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let tracker = Arc::new(JobTracker::new(submit_api_url, "test-internal-key".to_string()));
    let queue = Arc::new(JobQueue::new(conn, tracker, true));
    queue.create(false).await.unwrap();

    let id = queue.enqueue(sample_submission()).await.unwrap();
    let filter = JobFilter::new(Environment::Local, 8);
    let (dequeued_id, _) = queue.dequeue("worker-1", &filter).await.unwrap().unwrap();
    assert_eq!(dequeued_id, id);

    let result = queue
        .update_job_status(id, jobbroker::domain::JobStatus::Running, None, Some("worker-1"))
        .await;

    assert!(matches!(result, Err(QueueError::JobDeleted(deleted_id)) if deleted_id == id));
    assert_eq!(seen.0.lock().unwrap().as_slice(), [id]);

    let missing = queue.get_job(id, None).await;
    assert!(matches!(missing, Err(QueueError::NotFound(missing_id)) if missing_id == id));
}

//! The worker-facing HTTP surface: dispatch, status reporting, and file
//! transfer for the fleet of workers pulling jobs off the queue, plus the
//! API-key-gated internal endpoint the submit API uses to enqueue jobs.

mod error;
mod files;
mod internal;
mod jobs;
mod models;
mod state;

pub mod server;

pub use error::WorkerApiError;
pub use server::{router, run};
pub use state::AppState;

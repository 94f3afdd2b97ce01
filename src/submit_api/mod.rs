//! The user-facing HTTP surface: catalog-validated job submission, input
//! manifest resolution, and the private status-callback receiver the
//! Worker API's JobTracker posts to.

mod error;
mod handlers;
mod manifest;
mod models;
mod state;

pub mod server;

pub use error::SubmitApiError;
pub use server::{router, run};
pub use state::AppState;

//! Core data model shared by both binaries: the queue row, the wire
//! envelope the Submit API hands to the Worker API, the pull predicate,
//! and the application catalog.

mod catalog;
mod filter;
mod job;
mod status;

pub use catalog::{Application, Catalog, CatalogError, Entrypoint, EnvVarSpec, Version};
pub use filter::{JobFilter, JobFilterQuery};
pub use job::{AppSpecs, HandlerSpecs, HardwareSpecs, JobSpecs, MetaSpecs, PathsUpload, QueuedJob, SubmittedJob};
pub use status::{Environment, JobStatus};

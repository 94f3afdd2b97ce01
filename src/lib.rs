pub mod auth;
pub mod config;
pub mod domain;
pub mod observability;
pub mod queue;
pub mod storage;
pub mod submit_api;
pub mod timeout;
pub mod tracker;
pub mod worker_api;

//! Process-lifetime counters for the handful of events worth tracking
//! across a deployment, alongside the `tracing` spans that carry the
//! per-request detail. Deliberately small: the queue table itself is the
//! source of truth for anything that needs to survive a restart.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    jobs_enqueued: AtomicU64,
    jobs_dequeued: AtomicU64,
    jobs_requeued: AtomicU64,
    jobs_failed: AtomicU64,
    timeout_sweeps: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_enqueued", "metric incremented");
    }

    pub fn job_dequeued(&self) {
        self.jobs_dequeued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_dequeued", "metric incremented");
    }

    pub fn job_requeued(&self) {
        self.jobs_requeued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_requeued", "metric incremented");
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "jobs_failed", "metric incremented");
    }

    pub fn timeout_sweep(&self) {
        self.timeout_sweeps.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "timeout_sweeps", "metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_dequeued: self.jobs_dequeued.load(Ordering::Relaxed),
            jobs_requeued: self.jobs_requeued.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            timeout_sweeps: self.timeout_sweeps.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub jobs_enqueued: u64,
    pub jobs_dequeued: u64,
    pub jobs_requeued: u64,
    pub jobs_failed: u64,
    pub timeout_sweeps: u64,
}

//! Periodic sweep for stalled leases, wired as a fixed-interval loop
//! spawned once at startup. Each tick isolates its own errors so one
//! failed sweep
//! never kills the scheduler.

use std::sync::Arc;
use std::time::Duration;

use crate::observability::Metrics;
use crate::queue::JobQueue;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct TimeoutSupervisor {
    queue: Arc<JobQueue>,
    max_retries: u32,
    timeout_seconds: i64,
    metrics: Arc<Metrics>,
}

impl TimeoutSupervisor {
    pub fn new(queue: Arc<JobQueue>, max_retries: u32, timeout_seconds: i64, metrics: Arc<Metrics>) -> Self {
        Self {
            queue,
            max_retries,
            timeout_seconds,
            metrics,
        }
    }

    /// Spawns the supervisor loop as a background task. The returned
    /// handle is not normally awaited; drop it to detach, or abort it
    /// for a clean shutdown alongside the HTTP listener.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                self.sweep_once().await;
            }
        })
    }

    async fn sweep_once(&self) {
        self.metrics.timeout_sweep();
        match self.queue.handle_timeouts(self.max_retries, self.timeout_seconds).await {
            Ok((requeued, failed)) => {
                for _ in 0..requeued {
                    self.metrics.job_requeued();
                }
                for _ in 0..failed {
                    self.metrics.job_failed();
                }
                if requeued > 0 || failed > 0 {
                    tracing::info!(requeued, failed, "timeout supervisor sweep complete");
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "timeout supervisor sweep failed, will retry next tick");
            }
        }
    }
}

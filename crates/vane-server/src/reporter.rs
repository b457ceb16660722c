//! Backlog reporter: republishes queue length as a gauge for autoscaling.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vane_core::MetricsSink;
use vane_queue::JobQueue;

pub const QUEUE_LENGTH_METRIC: &str = "weather_queue_length";

/// Published when the queue length cannot be read. Deliberately negative so
/// a measurement failure never looks like an empty queue.
pub const LENGTH_READ_FAILED: f64 = -1.0;

/// Fixed-interval sampling loop over the queue's length.
pub struct BacklogReporter {
    queue: Arc<JobQueue>,
    metrics: Arc<dyn MetricsSink>,
    interval: Duration,
}

impl BacklogReporter {
    pub fn new(queue: Arc<JobQueue>, metrics: Arc<dyn MetricsSink>, interval: Duration) -> Self {
        Self {
            queue,
            metrics,
            interval,
        }
    }

    /// Runs until `cancel` fires, publishing one sample per tick.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("backlog reporter started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sample().await,
                () = cancel.cancelled() => break,
            }
        }
        tracing::info!("backlog reporter stopped");
    }

    async fn sample(&self) {
        match self.queue.len().await {
            Ok(length) => self
                .metrics
                .set_gauge(QUEUE_LENGTH_METRIC, length as f64),
            Err(err) => {
                tracing::warn!("backlog reporter: length read failed: {}", err);
                self.metrics.set_gauge(QUEUE_LENGTH_METRIC, LENGTH_READ_FAILED);
            }
        }
    }
}

impl std::fmt::Debug for BacklogReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacklogReporter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

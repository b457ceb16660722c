//! Queue worker: drains lookup jobs through the weather engine.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vane_core::MetricsSink;
use vane_queue::{Job, JobQueue, QueueError};
use vane_weather::{CallOptions, FaultSignal, WeatherEngine};

pub const JOBS_PROCESSED_METRIC: &str = "weather_jobs_processed_total";

/// Long-running consumer loop.
///
/// Unlike the engine's bounded fetch retries, pop failures are retried
/// forever: the worker is a service, not a request.
pub struct QueueWorker {
    queue: Arc<JobQueue>,
    engine: Arc<WeatherEngine>,
    metrics: Arc<dyn MetricsSink>,
    retry_pause: Duration,
}

impl QueueWorker {
    pub fn new(
        queue: Arc<JobQueue>,
        engine: Arc<WeatherEngine>,
        metrics: Arc<dyn MetricsSink>,
        retry_pause: Duration,
    ) -> Self {
        Self {
            queue,
            engine,
            metrics,
            retry_pause,
        }
    }

    /// Runs until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!("queue worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.queue.pop(&cancel).await {
                Err(QueueError::Cancelled) => break,
                Err(err) => {
                    tracing::error!("queue worker: pop failed: {}", err);
                    tokio::select! {
                        () = tokio::time::sleep(self.retry_pause) => {}
                        () = cancel.cancelled() => break,
                    }
                }
                // A malformed job was dropped inside pop; nothing to do.
                Ok(None) => continue,
                Ok(Some(job)) => {
                    process_job(&self.engine, self.metrics.as_ref(), job, &cancel).await;
                }
            }
        }
        tracing::info!("queue worker stopped");
    }
}

impl std::fmt::Debug for QueueWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueWorker")
            .field("retry_pause", &self.retry_pause)
            .finish_non_exhaustive()
    }
}

/// Drives one job through the engine. The outcome is recorded as a counted
/// observation, never fatal to the caller's loop.
async fn process_job(
    engine: &WeatherEngine,
    metrics: &dyn MetricsSink,
    job: Job,
    cancel: &CancellationToken,
) {
    let opts = CallOptions::new()
        .with_fault(FaultSignal::from_flag(job.fault))
        .with_cancellation(cancel.child_token());

    match engine.get_weather(&job.location, &opts).await {
        Ok(_) => metrics.increment_counter(JOBS_PROCESSED_METRIC, &[("outcome", "success")]),
        Err(err) => {
            tracing::warn!(
                "queue worker: job failed for {} (fault={}): {}",
                job.location,
                job.fault,
                err
            );
            metrics.increment_counter(JOBS_PROCESSED_METRIC, &[("outcome", "error")]);
        }
    }
}

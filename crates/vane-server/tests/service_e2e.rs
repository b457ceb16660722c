//! End-to-end scenarios over a live Redis queue.
//!
//! Run with: cargo test -p vane-server -- --ignored

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vane_core::RecordingSink;
use vane_queue::{Job, JobQueue};
use vane_server::worker::{QueueWorker, JOBS_PROCESSED_METRIC};
use vane_weather::{Fetcher, RetryConfig, StaticFetcher, WeatherEngine};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn fresh_queue(suffix: &str) -> Arc<JobQueue> {
    let name = format!("weather:e2e:{}:{}", std::process::id(), suffix);
    let queue = JobQueue::connect(&redis_url(), name).await.unwrap();
    // Drain anything a previous aborted run left behind.
    let drain = CancellationToken::new();
    while queue.len().await.unwrap() > 0 {
        let _ = queue.pop(&drain).await;
    }
    Arc::new(queue)
}

fn static_engine(sink: Arc<RecordingSink>) -> Arc<WeatherEngine> {
    Arc::new(WeatherEngine::new(
        Fetcher::Static(StaticFetcher::default()),
        RetryConfig::new(3, Duration::from_millis(1)),
        None,
        sink,
    ))
}

async fn wait_for_count(sink: &RecordingSink, outcome: &str, expected: f64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        if sink.counter_value(JOBS_PROCESSED_METRIC, &[("outcome", outcome)]) >= expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} {} jobs",
            expected,
            outcome
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
#[ignore]
async fn test_worker_drains_one_hundred_jobs_to_success() {
    let queue = fresh_queue("drain").await;
    let sink = Arc::new(RecordingSink::new());
    let engine = static_engine(sink.clone());

    let jobs: Vec<Job> = (0..100).map(|_| Job::new("lubbock", false)).collect();
    assert_eq!(queue.push_many(&jobs).await.unwrap(), 100);

    let cancel = CancellationToken::new();
    let worker = QueueWorker::new(
        queue.clone(),
        engine,
        sink.clone(),
        Duration::from_millis(100),
    );
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    wait_for_count(&sink, "success", 100.0).await;

    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(
        sink.counter_value(JOBS_PROCESSED_METRIC, &[("outcome", "success")]),
        100.0
    );
    assert_eq!(
        sink.counter_value(JOBS_PROCESSED_METRIC, &[("outcome", "error")]),
        0.0
    );
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_chaos_jobs_drain_to_error_outcomes() {
    let queue = fresh_queue("chaos").await;
    let sink = Arc::new(RecordingSink::new());
    let engine = static_engine(sink.clone());

    let jobs: Vec<Job> = (0..10).map(|_| Job::new("lubbock", true)).collect();
    assert_eq!(queue.push_many(&jobs).await.unwrap(), 10);

    let cancel = CancellationToken::new();
    let worker = QueueWorker::new(
        queue.clone(),
        engine.clone(),
        sink.clone(),
        Duration::from_millis(100),
    );
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    wait_for_count(&sink, "error", 10.0).await;

    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(
        sink.counter_value(JOBS_PROCESSED_METRIC, &[("outcome", "error")]),
        10.0
    );
    // Faulted jobs never touched the cache.
    assert_eq!(engine.cached_locations(), 0);
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_worker_stops_within_one_pop_wait_of_cancellation() {
    let queue = fresh_queue("stop").await;
    let sink = Arc::new(RecordingSink::new());
    let engine = static_engine(sink.clone());

    let cancel = CancellationToken::new();
    let worker = QueueWorker::new(queue, engine, sink, Duration::from_millis(100));
    let worker_cancel = cancel.clone();
    let handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(3), handle)
        .await
        .expect("worker did not stop after cancellation")
        .unwrap();
}

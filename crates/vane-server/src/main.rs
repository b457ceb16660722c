use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use vane_core::{Config, PrometheusSink};
use vane_queue::JobQueue;
use vane_server::reporter::BacklogReporter;
use vane_server::routes;
use vane_server::state::AppState;
use vane_server::worker::QueueWorker;
use vane_weather::{Fetcher, HttpFetcher, RetryConfig, StaticFetcher, WeatherEngine};

#[tokio::main]
async fn main() -> Result<()> {
    vane_core::init()?;

    let config = Config::from_env().context("loading configuration")?;

    let metrics = Arc::new(PrometheusSink::new(prometheus::Registry::new()));

    let fetcher = match &config.upstream_url {
        Some(url) => {
            tracing::info!("using HTTP upstream at {}", url);
            Fetcher::Http(
                HttpFetcher::new(url.clone(), config.request_timeout)
                    .context("building upstream client")?,
            )
        }
        None => {
            tracing::info!("no upstream configured, using static fetcher");
            Fetcher::Static(StaticFetcher::default())
        }
    };

    let engine = Arc::new(WeatherEngine::new(
        fetcher,
        RetryConfig::new(config.fetch_max_attempts, config.fetch_initial_delay),
        config.cache_ttl,
        metrics.clone(),
    ));

    let queue = Arc::new(
        JobQueue::connect(&config.redis_url, config.queue_name.clone())
            .await
            .context("connecting job queue")?,
    );

    let shutdown = CancellationToken::new();

    let worker = QueueWorker::new(
        queue.clone(),
        engine.clone(),
        metrics.clone(),
        config.worker_retry_pause,
    );
    let worker_cancel = shutdown.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    let reporter = BacklogReporter::new(queue.clone(), metrics.clone(), config.reporter_interval);
    let reporter_cancel = shutdown.clone();
    let reporter_handle = tokio::spawn(async move { reporter.run(reporter_cancel).await });

    let state = AppState {
        engine,
        queue,
        metrics,
    };
    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("server listening on {}", addr);

    let signal_cancel = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received");
            signal_cancel.cancel();
        })
        .await
        .context("serving")?;

    // The background loops exit within one pop-wait/tick interval of the
    // token firing.
    let _ = tokio::join!(worker_handle, reporter_handle);
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install ctrl-c handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

//! Cross-cutting concerns for the Vane weather service.
//!
//! Holds the pieces every other crate leans on: environment-driven
//! configuration and the injectable metrics sink.

pub mod config;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use metrics::{MetricsSink, NoopSink, PrometheusSink, RecordingSink};

use anyhow::Result;

/// Initialize tracing/logging for the process.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("vane core initialized");
    Ok(())
}

//! Cache-aside weather engine.
//!
//! Step order is fixed: fault check, cache lookup, retried fetch, cache
//! store. The fault check is strictly first; an injected call touches
//! neither the cache nor the upstream.

use std::sync::Arc;
use std::time::Duration;

use vane_core::MetricsSink;

use crate::cache::WeatherCache;
use crate::fetch::Fetcher;
use crate::retry::{with_retry, RetryConfig, RetryError};
use crate::types::{CallOptions, EngineError, WeatherReport};

pub const CACHE_HITS_METRIC: &str = "weather_service_cache_hits_total";
pub const CACHE_MISSES_METRIC: &str = "weather_service_cache_misses_total";

/// Orchestrates lookups against the cache and the upstream fetcher.
///
/// The engine owns its cache exclusively. Concurrent misses for the same
/// location may both fetch; the last write wins. Coalescing those into a
/// single flight is a possible hardening, not a correctness requirement.
pub struct WeatherEngine {
    cache: WeatherCache,
    fetcher: Fetcher,
    retry: RetryConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl WeatherEngine {
    pub fn new(
        fetcher: Fetcher,
        retry: RetryConfig,
        cache_ttl: Option<Duration>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            cache: WeatherCache::new(cache_ttl),
            fetcher,
            retry,
            metrics,
        }
    }

    /// Looks up current weather for `location`.
    pub async fn get_weather(
        &self,
        location: &str,
        opts: &CallOptions,
    ) -> Result<WeatherReport, EngineError> {
        if opts.fault.is_injected() {
            tracing::error!(
                "fault injection active for {}: bypassing cache and upstream",
                location
            );
            return Err(EngineError::FaultInjected);
        }

        if let Some(mut report) = self.cache.get(location) {
            report.cached = true;
            self.metrics.increment_counter(CACHE_HITS_METRIC, &[]);
            return Ok(report);
        }
        self.metrics.increment_counter(CACHE_MISSES_METRIC, &[]);

        let report = with_retry(&self.retry, &opts.cancel, || self.fetcher.fetch(location))
            .await
            .map_err(|err| match err {
                RetryError::Cancelled => EngineError::Cancelled,
                RetryError::Exhausted { attempts, last } => EngineError::UpstreamUnavailable {
                    attempts,
                    source: last,
                },
            })?;

        self.cache.store(location, report.clone());
        Ok(report)
    }

    /// Number of locations currently cached.
    pub fn cached_locations(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for WeatherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherEngine")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

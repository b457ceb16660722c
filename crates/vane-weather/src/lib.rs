//! Weather-fetch engine for Vane.
//!
//! Cache-aside lookups with priority-ordered fault injection, bounded
//! retry-with-backoff against the upstream, and per-call cancellation.

pub mod cache;
pub mod engine;
pub mod fetch;
pub mod retry;
pub mod types;

pub use cache::WeatherCache;
pub use engine::WeatherEngine;
pub use fetch::{Fetcher, HttpFetcher, StaticFetcher};
pub use retry::{with_retry, RetryConfig, RetryError};
pub use types::{CallOptions, EngineError, FaultSignal, FetchError, WeatherReport};

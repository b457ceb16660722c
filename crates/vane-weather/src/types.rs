//! Weather report, per-call options, and the engine error taxonomy.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Current weather for a single location.
///
/// `cached` is set at read time: the copy stored in the cache always carries
/// `false`; a copy returned on a cache hit is flagged `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature: f64,
    pub conditions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub cached: bool,
}

/// Per-call fault-injection override.
///
/// Three-state so "nobody said anything" is distinguishable from an explicit
/// opt-out; only `Inject` changes behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultSignal {
    #[default]
    Unset,
    Clear,
    Inject,
}

impl FaultSignal {
    /// Build a signal from an explicit boolean, e.g. a queued job's flag.
    pub fn from_flag(fault: bool) -> Self {
        if fault {
            Self::Inject
        } else {
            Self::Clear
        }
    }

    pub fn is_injected(self) -> bool {
        matches!(self, Self::Inject)
    }
}

/// Explicit per-call options passed to the engine.
///
/// Replaces ambient context values: the fault override and the cancellation
/// token are typed parameters the caller constructs from its own sources
/// (HTTP header/query, queued job field, shutdown signal).
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub fault: FaultSignal,
    pub cancel: CancellationToken,
}

impl CallOptions {
    /// Options with no fault override and a token that never fires.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fault(mut self, fault: FaultSignal) -> Self {
        self.fault = fault;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// A single upstream fetch attempt's failure. All variants are retryable.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream error: {0}")]
    UpstreamStatus(u16),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Weather engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The call was short-circuited by the fault signal.
    /// Never retried, never cached.
    #[error("fault injection triggered: simulated upstream failure")]
    FaultInjected,

    /// Every permitted fetch attempt failed.
    #[error("upstream unavailable after {attempts} attempts: {source}")]
    UpstreamUnavailable {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    /// The call's cancellation token fired mid-retry.
    #[error("request cancelled")]
    Cancelled,
}

//! Route table and request handlers.
//!
//! Handlers stay thin: fault-flag extraction and status mapping live here,
//! every real decision lives in the engine and queue crates.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use vane_queue::Job;
use vane_weather::{CallOptions, FaultSignal, WeatherReport};

use crate::middleware::track_requests;
use crate::state::AppState;

/// Location used by the bulk queue-load endpoint.
const LOAD_LOCATION: &str = "lubbock";
const DEFAULT_LOAD_COUNT: i64 = 100;
const MAX_LOAD_COUNT: i64 = 10_000;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/weather/:location", get(get_weather))
        .route("/queue/load", post(queue_load))
        .route("/queue/stats", get(queue_stats))
        .route("/health", get(health))
        .layer(from_fn_with_state(state.clone(), track_requests));

    // /metrics stays outside the instrumentation layer; scrapes should not
    // count as traffic.
    Router::new()
        .route("/metrics", get(metrics))
        .merge(api)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn internal_error(err: impl std::fmt::Display) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

#[derive(Debug, Deserialize)]
struct ChaosParams {
    chaos: Option<String>,
}

async fn get_weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(params): Query<ChaosParams>,
    headers: HeaderMap,
) -> Result<Json<WeatherReport>, HandlerError> {
    let fault = fault_signal(&headers, params.chaos.as_deref());
    let opts = CallOptions::new().with_fault(fault);

    match state.engine.get_weather(&location, &opts).await {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            tracing::error!("weather lookup failed for {}: {}", location, err);
            Err(internal_error(err))
        }
    }
}

/// Fault flag sources: the `X-Chaos-Mode` header and the `?chaos=` query
/// parameter. Either one set to `true` injects; any other explicit value
/// clears the flag; nothing at all leaves it unset.
fn fault_signal(headers: &HeaderMap, chaos_query: Option<&str>) -> FaultSignal {
    let header = headers.get("x-chaos-mode").and_then(|v| v.to_str().ok());
    match (header, chaos_query) {
        (Some("true"), _) | (_, Some("true")) => FaultSignal::Inject,
        (None, None) => FaultSignal::Unset,
        _ => FaultSignal::Clear,
    }
}

#[derive(Debug, Deserialize)]
struct LoadParams {
    count: Option<i64>,
    chaos: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoadResponse {
    loaded: usize,
    chaos: bool,
    queue: String,
}

async fn queue_load(
    State(state): State<AppState>,
    Query(params): Query<LoadParams>,
) -> Result<Json<LoadResponse>, HandlerError> {
    let count = match params.count {
        Some(n) if n > 0 && n <= MAX_LOAD_COUNT => n,
        _ => DEFAULT_LOAD_COUNT,
    };
    let chaos = params.chaos.as_deref() == Some("true");

    let jobs: Vec<Job> = (0..count).map(|_| Job::new(LOAD_LOCATION, chaos)).collect();
    match state.queue.push_many(&jobs).await {
        Ok(loaded) => Ok(Json(LoadResponse {
            loaded,
            chaos,
            queue: state.queue.name().to_string(),
        })),
        Err(err) => {
            tracing::error!("queue load failed: {}", err);
            Err(internal_error(err))
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    length: i64,
    queue: String,
}

async fn queue_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, HandlerError> {
    match state.queue.len().await {
        Ok(length) => Ok(Json(StatsResponse {
            length,
            queue: state.queue.name().to_string(),
        })),
        Err(err) => {
            tracing::error!("queue stats failed: {}", err);
            Err(internal_error(err))
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "up" })
}

async fn metrics(State(state): State<AppState>) -> Result<String, HandlerError> {
    let encoder = prometheus::TextEncoder::new();
    encoder
        .encode_to_string(&state.metrics.registry().gather())
        .map_err(internal_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_chaos(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-chaos-mode", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_fault_signal_from_header() {
        assert_eq!(
            fault_signal(&headers_with_chaos("true"), None),
            FaultSignal::Inject
        );
        assert_eq!(
            fault_signal(&headers_with_chaos("false"), None),
            FaultSignal::Clear
        );
    }

    #[test]
    fn test_fault_signal_from_query() {
        assert_eq!(
            fault_signal(&HeaderMap::new(), Some("true")),
            FaultSignal::Inject
        );
        assert_eq!(
            fault_signal(&HeaderMap::new(), Some("false")),
            FaultSignal::Clear
        );
    }

    #[test]
    fn test_fault_signal_header_wins_over_query() {
        assert_eq!(
            fault_signal(&headers_with_chaos("true"), Some("false")),
            FaultSignal::Inject
        );
    }

    #[test]
    fn test_fault_signal_absent_everywhere_is_unset() {
        assert_eq!(fault_signal(&HeaderMap::new(), None), FaultSignal::Unset);
    }
}

//! Request instrumentation: request IDs plus RED metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;
use vane_core::MetricsSink;

use crate::state::AppState;

pub const HTTP_REQUESTS_METRIC: &str = "weather_service_http_requests_total";
pub const HTTP_DURATION_METRIC: &str = "weather_service_http_request_duration_seconds";

/// Counts every request and observes its latency, labeled by route
/// template, method, and status code.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().to_string();
    // Label by the route template, not the raw path, to keep metric
    // cardinality bounded.
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status();
    state.metrics.increment_counter(
        HTTP_REQUESTS_METRIC,
        &[
            ("path", path.as_str()),
            ("method", method.as_str()),
            ("code", status.as_str()),
        ],
    );
    state.metrics.observe_histogram(
        HTTP_DURATION_METRIC,
        &[("path", path.as_str()), ("method", method.as_str())],
        elapsed,
    );

    tracing::info!(
        request_id = %request_id,
        path = %path,
        method = %method,
        status = status.as_u16(),
        latency = elapsed,
        "request completed"
    );

    response
}

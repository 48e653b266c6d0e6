//! Prometheus metrics for Bindgate
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;
use tracing::debug;

use crate::server::AppState;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "bindgate_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "bindgate_http_request_duration_seconds";

    // Authentication metrics
    pub const AUTH_ATTEMPTS_TOTAL: &str = "bindgate_auth_attempts_total";
    pub const AUTH_DURATION_SECONDS: &str = "bindgate_auth_duration_seconds";

    // System metrics
    pub const UPTIME_SECONDS: &str = "bindgate_uptime_seconds";
    pub const INFO: &str = "bindgate_info";
}

/// Outcome label of an authentication attempt.
///
/// Failure reasons stay in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure,
}

impl AuthOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the process-wide Prometheus recorder
    pub fn install() -> bindgate_core::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

        gauge!(names::INFO, "version" => bindgate_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_class = format!("{}xx", status / 100);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string(),
        "status_class" => status_class
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Record an authentication attempt
pub fn record_auth_attempt(outcome: AuthOutcome, duration_secs: f64) {
    counter!(names::AUTH_ATTEMPTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    histogram!(names::AUTH_DURATION_SECONDS, "outcome" => outcome.as_str()).record(duration_secs);
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();

    // Route template keeps label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    record_http_request(&method, &path, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.as_ref() {
        Some(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AuthOutcome::Success.as_str(), "success");
        assert_eq!(AuthOutcome::Failure.as_str(), "failure");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_http_request("POST", "/auth/ldap", 401, 0.01);
        record_auth_attempt(AuthOutcome::Failure, 0.01);
    }
}

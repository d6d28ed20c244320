//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gk_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: standard HTTP methods, anything else is `OTHER`
//! - `endpoint`: `/health`, `/metrics` or `/proxy`
//! - `status`: 3 values (success, error, timeout), on duration histograms and
//!   backend counters
//! - `status_code`: numeric HTTP status, on `gk_http_requests_total` only;
//!   bounded by the statuses the gateway and its backends return
//! - `outcome`: 6 values (open, authenticated, plus one per failure kind)
//! - `route`: bounded by the configured route table

use metrics::counter;
use metrics::histogram;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Whole-request latency as seen by clients
        .set_buckets_for_metric(
            Matcher::Prefix("gk_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Backend round trips, up to the default 30s backend timeout
        .set_buckets_for_metric(
            Matcher::Prefix("gk_backend_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
                30.000,
            ],
        )
        .map_err(|e| format!("Failed to set backend request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gk_http_requests_total`
/// Labels: `method`, `endpoint`, `status_code`
///
/// Metric: `gk_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses, including 401s from the filter, 404s
/// for unmatched paths and timeouts.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let method = normalize_method(method);
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gk_http_request_duration_seconds",
        "method" => method,
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gk_http_requests_total",
        "method" => method,
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Collapse arbitrary methods into a fixed set.
fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Operational endpoints keep their path; everything forwarded is `/proxy`.
/// Per-route detail lives on the backend metrics.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/proxy",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record the filter's decision for one request.
///
/// Metric: `gk_auth_decisions_total`
/// Labels: `outcome`
pub fn record_auth_decision(outcome: &'static str) {
    counter!("gk_auth_decisions_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Backend Metrics
// ============================================================================

/// Record one forwarded request.
///
/// Metric: `gk_backend_requests_total`, `gk_backend_request_duration_seconds`
/// Labels: `route` (configured pattern), `status`
///
/// `status_code` is `None` when the backend could not be reached.
pub fn record_backend_request(route: &str, status_code: Option<u16>, duration: Duration) {
    let status = match status_code {
        Some(code) => categorize_status_code(code),
        None => "unavailable",
    };

    histogram!("gk_backend_request_duration_seconds",
        "route" => route.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gk_backend_requests_total",
        "route" => route.to_string(),
        "status" => status
    )
    .increment(1);
}

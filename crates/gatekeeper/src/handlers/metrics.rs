//! Prometheus metrics endpoint handler.
//!
//! `/metrics` is served without authentication so Prometheus can scrape it.
//! Labels carry route patterns and outcome categories only: no paths,
//! subjects or tokens.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE gk_auth_decisions_total counter
/// gk_auth_decisions_total{outcome="authenticated"} 42
/// ```
#[tracing::instrument(skip_all, name = "gk.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

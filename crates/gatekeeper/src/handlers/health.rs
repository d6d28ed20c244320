//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Liveness probe.
///
/// The gateway has no dependencies of its own to ping, so a response means
/// the process is serving. Backends are not probed.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "gateway_id": "gk-node1-1a2b3c4d",
///   "routes": 3
/// }
/// ```
#[instrument(skip_all, name = "gk.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        gateway_id: state.config.gateway_id.clone(),
        routes: state.routes.len(),
    })
}

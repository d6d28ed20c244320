//! HTTP routes for the gateway.
//!
//! Defines the Axum router and application state. The gateway owns
//! `/health` and `/metrics`; every other path goes to the proxy fallback.

pub mod table;

use crate::auth::ClaimsCodec;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, AuthFilter};
use crate::policy::{OpenRoutes, RoutePolicy};
use crate::services::BackendClient;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use table::{Route, RouteTable};

/// Added to the backend timeout so that slow backends surface as 502
/// from the forwarder rather than 408 from the timeout layer.
const REQUEST_TIMEOUT_GRACE_SECS: u64 = 5;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Routes in match order.
    pub routes: RouteTable,

    /// Authentication filter run before every dispatch.
    pub filter: AuthFilter,

    /// Backend dispatcher.
    pub backend: Arc<dyn BackendClient>,
}

impl AppState {
    /// Wire policy, codec and route table from configuration.
    pub fn new(config: Config, backend: Arc<dyn BackendClient>) -> Self {
        let policy: Arc<dyn RoutePolicy> = Arc::new(OpenRoutes::new(&config.open_routes));
        let codec = Arc::new(ClaimsCodec::new(&config.jwt_secret, config.jwt_algorithm));
        let routes = RouteTable::from_config(&config.routes, policy.as_ref());

        Self {
            config,
            routes,
            filter: AuthFilter::new(policy, codec),
            backend,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness endpoint
/// - `/metrics` - Prometheus metrics endpoint
/// - fallback - route match, authentication filter, backend dispatch
/// - request ID generation and propagation (`x-request-id`)
/// - TraceLayer for request logging
/// - request timeout (backend timeout plus grace)
/// - HTTP metrics for every response
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let request_timeout =
        Duration::from_secs(state.config.backend_timeout_seconds + REQUEST_TIMEOUT_GRACE_SECS);

    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let gateway_routes = Router::new()
        .fallback(handlers::route_request)
        .with_state(state);

    // Layer order (last added runs first):
    // 1. http_metrics_middleware - outermost, sees every response
    // 2. SetRequestIdLayer - generate x-request-id when absent
    // 3. PropagateRequestIdLayer - copy it onto the response
    // 4. TraceLayer - log request details
    // 5. TimeoutLayer - innermost
    operational_routes
        .merge(metrics_routes)
        .merge(gateway_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(middleware::from_fn(http_metrics_middleware))
}

//! HTTP metrics middleware.
//!
//! Records every response the gateway produces, including 401s from the
//! authentication filter, 404s for unmatched paths and timeout responses.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, endpoint, status and duration.
///
/// Applied as the outermost layer so that responses produced by inner
/// layers are counted too.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_401() -> (StatusCode, &'static str) {
        (StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/health", get(handler_200))
            .route("/users/42", get(handler_401))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn status_of(uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_passes_success_through() {
        assert_eq!(status_of("/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_passes_rejection_through() {
        assert_eq!(status_of("/users/42").await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_passes_not_found_through() {
        assert_eq!(status_of("/nonexistent").await, StatusCode::NOT_FOUND);
    }
}

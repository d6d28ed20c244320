//! Gateway dispatch handler.
//!
//! Every path the gateway does not own itself lands here. The handler
//! canonicalizes the path, picks the first matching route, runs the
//! authentication filter and, if the filter admits the request, forwards it
//! to the route's backend.

use crate::errors::GatewayError;
use crate::models::RequestContext;
use crate::observability::metrics::record_backend_request;
use crate::policy::normalize_path;
use crate::routes::{AppState, Route};
use crate::services::BackendClient;
use axum::extract::{Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument};

/// Route, authenticate and dispatch one request.
///
/// # Response
///
/// - No route matches the canonical path: 404, nothing forwarded
/// - Filter rejects: 401, nothing forwarded
/// - Otherwise: the backend's response, or 502 if it cannot be reached
#[instrument(skip_all, name = "gk.proxy.route_request", fields(method = %req.method()))]
pub async fn route_request(State(state): State<Arc<AppState>>, mut req: Request) -> Response {
    let path = normalize_path(req.uri().path()).into_owned();
    if path != req.uri().path() {
        match rewrite_path(req.uri(), &path) {
            Ok(uri) => *req.uri_mut() = uri,
            Err(e) => return e.into_response(),
        }
    }

    let Some(route) = state.routes.match_path(&path).cloned() else {
        return GatewayError::NoRouteMatch(path).into_response();
    };
    debug!(target: "gk.handlers.proxy", route = %route.pattern, "Route matched");

    req.extensions_mut().insert(RequestContext::new(path));

    let backend = Arc::clone(&state.backend);
    state
        .filter
        .apply(req, move |req| async move {
            dispatch(backend.as_ref(), &route, req).await
        })
        .await
}

async fn dispatch(backend: &dyn BackendClient, route: &Route, req: Request) -> Response {
    let start = Instant::now();
    match backend.forward(&route.target, req).await {
        Ok(response) => {
            record_backend_request(
                &route.pattern,
                Some(response.status().as_u16()),
                start.elapsed(),
            );
            response
        }
        Err(e) => {
            let status = match e {
                GatewayError::BackendUnavailable(_) => None,
                _ => Some(e.status_code()),
            };
            record_backend_request(&route.pattern, status, start.elapsed());
            e.into_response()
        }
    }
}

/// Same URI with its path replaced; the query is kept.
fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, GatewayError> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().map_err(|e| {
        error!(target: "gk.handlers.proxy", error = %e, "Failed to rebuild request path");
        GatewayError::Internal
    })?);

    Uri::from_parts(parts).map_err(|e| {
        error!(target: "gk.handlers.proxy", error = %e, "Failed to rebuild request URI");
        GatewayError::Internal
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::backend::mock::MockBackend;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::Router;
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    const SECRET: &str = "proxy-handler-test-secret-32-bytes!!";

    fn config() -> Config {
        Config::from_vars(&HashMap::from([
            ("JWT_SECRET".to_string(), SECRET.to_string()),
            (
                "GATEWAY_ROUTES".to_string(),
                "/auth/**=http://auth-service:8081,/users/**=http://user-service:8082"
                    .to_string(),
            ),
        ]))
        .unwrap()
    }

    fn app(backend: Arc<MockBackend>) -> Router {
        let state = Arc::new(AppState::new(config(), backend));
        Router::new().fallback(route_request).with_state(state)
    }

    fn token(sub: &str, role: &str, exp_offset: i64) -> String {
        encode(
            &Header::default(),
            &json!({
                "sub": sub,
                "role": role,
                "exp": chrono::Utc::now().timestamp() + exp_offset,
            }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn get(uri: &str) -> axum::http::request::Builder {
        axum::http::Request::builder().method("GET").uri(uri)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_open_route_forwarded_unchanged() {
        let backend = Arc::new(MockBackend::with_response(StatusCode::OK, "welcome"));

        let response = app(backend.clone())
            .oneshot(
                get("/auth/login?next=%2Fhome")
                    .header("x-client", "web")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.call_count(), 1);
        let recorded = backend.last_request().unwrap();
        assert_eq!(recorded.target.as_str(), "http://auth-service:8081/");
        assert_eq!(recorded.uri.to_string(), "/auth/login?next=%2Fhome");
        assert_eq!(recorded.headers.get("x-client").unwrap(), "web");
        assert!(recorded.headers.get("id").is_none());
        assert!(recorded.context.unwrap().identity().is_none());
    }

    #[tokio::test]
    async fn test_missing_header_never_reaches_backend() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(get("/users/42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "Authorization header is missing in request"
        );
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_valid_token_forwards_identity() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/users/42")
                    .header("authorization", format!("Bearer {}", token("7", "ADMIN", 3600)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let recorded = backend.last_request().unwrap();
        assert_eq!(recorded.target.as_str(), "http://user-service:8082/");
        assert_eq!(recorded.headers.get("id").unwrap(), "7");
        assert_eq!(recorded.headers.get("role").unwrap(), "ADMIN");

        let context = recorded.context.unwrap();
        assert_eq!(context.path(), "/users/42");
        assert_eq!(context.identity().unwrap().role, "ADMIN");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/users/42")
                    .header("authorization", format!("Bearer {}", token("7", "ADMIN", -1)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "Authorization header is invalid"
        );
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_found() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/payments/1")
                    .header("authorization", format!("Bearer {}", token("7", "ADMIN", 3600)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_traversal_out_of_open_route_is_secured() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/auth/login/../../users/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_encoded_traversal_out_of_open_route_is_secured() {
        for uri in [
            "/auth/login/%2e%2e/%2e%2e/users/42",
            "/auth/login/%2E%2E/%2E%2E/users/42",
            "/auth/login/.%2e/.%2e/users/42",
            "/auth/login/%2e./%2e./users/42",
        ] {
            let backend = Arc::new(MockBackend::ok());

            let response = app(backend.clone())
                .oneshot(get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(backend.call_count(), 0, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_encoded_traversal_forwards_canonical_path() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/users/42/%2e%2e/7?x=1")
                    .header("authorization", format!("Bearer {}", token("7", "USER", 3600)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.last_request().unwrap().uri.to_string(), "/users/7?x=1");
    }

    #[tokio::test]
    async fn test_forwarded_uri_is_canonical() {
        let backend = Arc::new(MockBackend::ok());

        let response = app(backend.clone())
            .oneshot(
                get("/users//42/./orders?page=2")
                    .header("authorization", format!("Bearer {}", token("7", "USER", 3600)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let recorded = backend.last_request().unwrap();
        assert_eq!(recorded.uri.to_string(), "/users/42/orders?page=2");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_bad_gateway() {
        let backend = Arc::new(MockBackend::failing());

        let response = app(backend.clone())
            .oneshot(get("/auth/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_status_relayed() {
        let backend = Arc::new(MockBackend::with_response(StatusCode::CONFLICT, "taken"));

        let response = app(backend)
            .oneshot(get("/auth/register").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_rewrite_path_keeps_query() {
        let uri: Uri = "/a//b?x=1&y=2".parse().unwrap();

        let rewritten = rewrite_path(&uri, "/a/b").unwrap();

        assert_eq!(rewritten.to_string(), "/a/b?x=1&y=2");
    }
}

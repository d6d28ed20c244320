//! Backend dispatch.
//!
//! Forwards an admitted request to the backend that owns its route and
//! relays the backend's answer unchanged.
//!
//! # Behavior
//!
//! - Upstream URL is the route target followed by the original path and query
//! - Request bodies are buffered up to a configured limit
//! - Hop-by-hop headers and `Host` are not forwarded in either direction
//! - Transport failures and timeouts become `BackendUnavailable`; backend
//!   error statuses are relayed as-is

use crate::errors::GatewayError;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, Uri};
use axum::response::Response;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Connect timeout for backend connections.
const BACKEND_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Sends requests to backend services.
#[async_trait::async_trait]
pub trait BackendClient: Send + Sync {
    /// Forward `req` to the backend at `target`.
    async fn forward(&self, target: &Url, req: Request) -> Result<Response, GatewayError>;
}

/// HTTP forwarder backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpBackend {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Largest request body buffered before forwarding.
    max_body_bytes: usize,
}

impl HttpBackend {
    /// Create a new forwarder.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(BACKEND_CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                error!(target: "gk.services.backend", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait::async_trait]
impl BackendClient for HttpBackend {
    #[instrument(skip_all, name = "gk.backend.forward", fields(upstream = %target))]
    async fn forward(&self, target: &Url, req: Request) -> Result<Response, GatewayError> {
        let (parts, body) = req.into_parts();
        let url = upstream_url(target, &parts.uri)?;

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| {
                warn!(target: "gk.services.backend", error = %e, "Failed to buffer request body");
                GatewayError::PayloadTooLarge(self.max_body_bytes)
            })?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "gk.services.backend", error = %e, "Backend request failed");
                GatewayError::BackendUnavailable(e.to_string())
            })?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);
        response_headers.remove(header::CONTENT_LENGTH);

        let bytes = upstream.bytes().await.map_err(|e| {
            warn!(target: "gk.services.backend", error = %e, "Failed to read backend response");
            GatewayError::BackendUnavailable(e.to_string())
        })?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Target base URL followed by the request's path and query.
fn upstream_url(target: &Url, uri: &Uri) -> Result<Url, GatewayError> {
    let base = target.as_str().trim_end_matches('/');
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());

    Url::parse(&format!("{base}{path_and_query}")).map_err(|e| {
        error!(target: "gk.services.backend", error = %e, "Failed to build upstream URL");
        GatewayError::Internal
    })
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Mock backend for testing.
///
/// Records every forwarded request so tests can assert on what a backend
/// would have received.
pub mod mock {
    use super::*;
    use crate::models::RequestContext;
    use axum::http::{Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// What the mock saw for one forwarded request.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: Method,
        pub target: Url,
        pub uri: Uri,
        pub headers: HeaderMap,
        pub context: Option<RequestContext>,
    }

    /// Mock backend for unit testing.
    pub struct MockBackend {
        /// Status to answer with.
        status: StatusCode,
        /// Body to answer with.
        body: String,
        /// Whether to fail as if the backend were unreachable.
        return_error: bool,
        /// Number of calls made.
        call_count: AtomicUsize,
        /// Requests received, in order.
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockBackend {
        /// Create a mock that answers 200 with an empty body.
        pub fn ok() -> Self {
            Self::with_response(StatusCode::OK, "")
        }

        /// Create a mock that answers with `status` and `body`.
        pub fn with_response(status: StatusCode, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                return_error: false,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock that is unreachable.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::ok()
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// All requests received so far.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests
                .lock()
                .map(|r| r.clone())
                .unwrap_or_default()
        }

        /// The most recent request, if any.
        pub fn last_request(&self) -> Option<RecordedRequest> {
            self.requests().pop()
        }
    }

    #[async_trait::async_trait]
    impl BackendClient for MockBackend {
        async fn forward(&self, target: &Url, req: Request) -> Result<Response, GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Ok(mut requests) = self.requests.lock() {
                requests.push(RecordedRequest {
                    method: req.method().clone(),
                    target: target.clone(),
                    uri: req.uri().clone(),
                    headers: req.headers().clone(),
                    context: req.extensions().get::<RequestContext>().cloned(),
                });
            }

            if self.return_error {
                return Err(GatewayError::BackendUnavailable(
                    "Mock backend error".to_string(),
                ));
            }

            let mut response = Response::new(Body::from(self.body.clone()));
            *response.status_mut() = self.status;
            Ok(response)
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used)]
    mod tests {
        use super::*;

        fn target() -> Url {
            Url::parse("http://user-service:8082").unwrap()
        }

        fn request(uri: &str) -> Request {
            axum::http::Request::builder()
                .uri(uri)
                .header("id", "7")
                .body(Body::empty())
                .unwrap()
        }

        #[tokio::test]
        async fn test_mock_ok_records_request() {
            let mock = MockBackend::ok();
            let response = mock.forward(&target(), request("/users/42")).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(mock.call_count(), 1);

            let recorded = mock.last_request().unwrap();
            assert_eq!(recorded.uri.path(), "/users/42");
            assert_eq!(recorded.headers.get("id").unwrap(), "7");
            assert_eq!(recorded.target, target());
            assert!(recorded.context.is_none());
        }

        #[tokio::test]
        async fn test_mock_with_response() {
            let mock = MockBackend::with_response(StatusCode::CREATED, "made");
            let response = mock.forward(&target(), request("/users")).await.unwrap();

            assert_eq!(response.status(), StatusCode::CREATED);
        }

        #[tokio::test]
        async fn test_mock_failing_still_counts() {
            let mock = MockBackend::failing();
            let result = mock.forward(&target(), request("/users")).await;

            assert!(matches!(result, Err(GatewayError::BackendUnavailable(_))));
            assert_eq!(mock.call_count(), 1);
            assert_eq!(mock.requests().len(), 1);
        }
    }
}

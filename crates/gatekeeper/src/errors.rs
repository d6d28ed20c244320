//! Gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic to avoid
//! leaking internal details. Actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when a secured route is called without credentials.
pub const MISSING_AUTH_MESSAGE: &str = "Authorization header is missing in request";

/// Message returned for every other token failure.
pub const INVALID_AUTH_MESSAGE: &str = "Authorization header is invalid";

/// Why a request failed authentication.
///
/// Clients never see these kinds directly; they are collapsed into one of
/// two 401 messages. The kind is logged and counted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingAuth,

    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

impl AuthError {
    /// Label used for metrics and log fields.
    pub fn as_label(self) -> &'static str {
        match self {
            AuthError::MissingAuth => "missing_auth",
            AuthError::Malformed => "malformed",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "expired",
        }
    }

    /// Message sent to the client.
    pub fn client_message(self) -> &'static str {
        match self {
            AuthError::MissingAuth => MISSING_AUTH_MESSAGE,
            AuthError::Malformed | AuthError::BadSignature | AuthError::Expired => {
                INVALID_AUTH_MESSAGE
            }
        }
    }
}

/// Gateway error type.
///
/// Maps to appropriate HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - NoRouteMatch: 404 Not Found
/// - PayloadTooLarge: 413 Payload Too Large
/// - BackendUnavailable: 502 Bad Gateway
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthError),

    #[error("No route matches path: {0}")]
    NoRouteMatch(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthorized(_) => 401,
            GatewayError::NoRouteMatch(_) => 404,
            GatewayError::PayloadTooLarge(_) => 413,
            GatewayError::BackendUnavailable(_) => 502,
            GatewayError::Internal => 500,
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        GatewayError::Unauthorized(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::Unauthorized(kind) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                kind.client_message().to_string(),
            ),
            GatewayError::NoRouteMatch(path) => {
                tracing::debug!(target: "gk.routing", path = %path, "No route matched request");
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "No route matches the requested path".to_string(),
                )
            }
            GatewayError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Request body exceeds {limit} bytes"),
            ),
            GatewayError::BackendUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "gk.backend", reason = %reason, "Backend unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "BACKEND_UNAVAILABLE",
                    "Backend service unavailable".to_string(),
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"gatekeeper\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(
            AuthError::MissingAuth.client_message(),
            "Authorization header is missing in request"
        );
        for kind in [
            AuthError::Malformed,
            AuthError::BadSignature,
            AuthError::Expired,
        ] {
            assert_eq!(kind.client_message(), "Authorization header is invalid");
        }
    }

    #[test]
    fn test_auth_error_labels_are_distinct() {
        let labels = [
            AuthError::MissingAuth.as_label(),
            AuthError::Malformed.as_label(),
            AuthError::BadSignature.as_label(),
            AuthError::Expired.as_label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }

    #[test]
    fn test_display_no_route_match() {
        let error = GatewayError::NoRouteMatch("/nowhere".to_string());
        assert_eq!(format!("{}", error), "No route matches path: /nowhere");
    }

    #[test]
    fn test_display_unauthorized() {
        let error = GatewayError::from(AuthError::Expired);
        assert_eq!(format!("{}", error), "Unauthorized: token has expired");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::Unauthorized(AuthError::MissingAuth).status_code(),
            401
        );
        assert_eq!(GatewayError::NoRouteMatch("/x".to_string()).status_code(), 404);
        assert_eq!(GatewayError::PayloadTooLarge(10).status_code(), 413);
        assert_eq!(
            GatewayError::BackendUnavailable("down".to_string()).status_code(),
            502
        );
        assert_eq!(GatewayError::Internal.status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_missing_auth() {
        let response = GatewayError::Unauthorized(AuthError::MissingAuth).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"gatekeeper\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UNAUTHORIZED");
        assert_eq!(
            body_json["error"]["message"],
            "Authorization header is missing in request"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_token_is_uniform() {
        for kind in [
            AuthError::Malformed,
            AuthError::BadSignature,
            AuthError::Expired,
        ] {
            let response = GatewayError::Unauthorized(kind).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body_json = read_body_json(response.into_body()).await;
            assert_eq!(body_json["error"]["code"], "UNAUTHORIZED");
            assert_eq!(
                body_json["error"]["message"],
                "Authorization header is invalid"
            );
        }
    }

    #[tokio::test]
    async fn test_into_response_no_route_match_hides_path() {
        let response = GatewayError::NoRouteMatch("/internal/secret".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert!(!body_json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("secret"));
    }

    #[tokio::test]
    async fn test_into_response_backend_unavailable_is_generic() {
        let error = GatewayError::BackendUnavailable("connection refused to 10.0.0.7".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BACKEND_UNAVAILABLE");
        assert_eq!(body_json["error"]["message"], "Backend service unavailable");
    }

    #[tokio::test]
    async fn test_into_response_payload_too_large() {
        let response = GatewayError::PayloadTooLarge(1024).into_response();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = GatewayError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body_json["error"]["message"], "An internal error occurred");
    }
}

//! Authentication filter.
//!
//! Decides per request whether a token is required, verifies it when it is,
//! and hands the request on with the verified identity attached. Open routes
//! pass through untouched.

use crate::auth::{Claims, ClaimsCodec};
use crate::errors::{AuthError, GatewayError};
use crate::models::{Identity, RequestContext, ID_HEADER, ROLE_HEADER};
use crate::observability::metrics::record_auth_decision;
use crate::policy::RoutePolicy;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Route policy plus token codec: everything the filter needs.
#[derive(Clone)]
pub struct AuthFilter {
    policy: Arc<dyn RoutePolicy>,
    codec: Arc<ClaimsCodec>,
}

impl AuthFilter {
    pub fn new(policy: Arc<dyn RoutePolicy>, codec: Arc<ClaimsCodec>) -> Self {
        Self { policy, codec }
    }

    /// The policy deciding which paths are secured.
    pub fn policy(&self) -> &dyn RoutePolicy {
        self.policy.as_ref()
    }

    /// Run the filter, calling `next` only when the request may proceed.
    ///
    /// # Response
    ///
    /// - Open route: whatever `next` returns, request unchanged
    /// - Missing `Authorization` on a secured route: 401, `next` not called
    /// - Any token failure: uniform 401, `next` not called
    /// - Valid token: `id` and `role` headers overwritten with the verified
    ///   values, [`RequestContext`] and [`Claims`] stored in extensions, then
    ///   whatever `next` returns
    #[instrument(skip_all, name = "gk.middleware.auth", fields(path = %req.uri().path()))]
    pub async fn apply<F, Fut>(&self, mut req: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let path = req.uri().path().to_string();

        if !self.policy.is_secured(&path) {
            tracing::debug!(target: "gk.middleware.auth", "Open route, authentication skipped");
            record_auth_decision("open");
            return next(req).await;
        }

        let claims = match self.authenticate(req.headers()) {
            Ok(claims) => claims,
            Err(e) => return reject(e),
        };

        let identity = Identity::from(&claims);
        if let Err(e) = set_identity_headers(req.headers_mut(), &identity) {
            return reject(e);
        }

        let context = req
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::new(path))
            .with_identity(identity);
        req.extensions_mut().insert(context);
        req.extensions_mut().insert(claims);

        tracing::debug!(target: "gk.middleware.auth", "Request authenticated");
        record_auth_decision("authenticated");
        next(req).await
    }

    /// Verify the credentials in `headers` without touching the request.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingAuth)?;
        let token = bearer_token(value)?;
        self.codec.decode_and_verify(token)
    }
}

/// Pull the token out of an `Authorization` value.
///
/// Accepts `Bearer <token>` (scheme case-insensitive) or a bare token. Any
/// other scheme is rejected.
fn bearer_token(value: &HeaderValue) -> Result<&str, AuthError> {
    let value = value.to_str().map_err(|_| AuthError::Malformed)?.trim();

    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return Err(AuthError::Malformed),
        None => value,
    };

    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

/// Replace any client-supplied identity headers with the verified ones.
///
/// Both values are built before either header is written.
fn set_identity_headers(headers: &mut HeaderMap, identity: &Identity) -> Result<(), AuthError> {
    let id = HeaderValue::from_str(&identity.subject).map_err(|_| AuthError::Malformed)?;
    let role = HeaderValue::from_str(&identity.role).map_err(|_| AuthError::Malformed)?;

    headers.insert(HeaderName::from_static(ID_HEADER), id);
    headers.insert(HeaderName::from_static(ROLE_HEADER), role);
    Ok(())
}

fn reject(e: AuthError) -> Response {
    tracing::debug!(target: "gk.middleware.auth", reason = e.as_label(), "Request rejected");
    record_auth_decision(e.as_label());
    GatewayError::Unauthorized(e).into_response()
}

/// Axum adapter for [`AuthFilter::apply`].
///
/// ```rust,ignore
/// router.layer(middleware::from_fn_with_state(filter, require_auth))
/// ```
pub async fn require_auth(
    State(filter): State<Arc<AuthFilter>>,
    req: Request,
    next: Next,
) -> Response {
    filter.apply(req, |req| next.run(req)).await
}

/// Extension trait for reading what the filter attached to a request.
pub trait ClaimsExt {
    /// The verified claims; `None` on open routes.
    fn claims(&self) -> Option<&Claims>;

    /// The request context; carries an identity only after verification.
    fn request_context(&self) -> Option<&RequestContext>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }

    fn request_context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }
}

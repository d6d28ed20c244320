//! Gateway models.
//!
//! Contains data types shared between the filter, the router and the
//! operational handlers.

use crate::auth::Claims;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the verified subject to backends.
pub const ID_HEADER: &str = "id";

/// Header carrying the verified role to backends.
pub const ROLE_HEADER: &str = "role";

/// Identity derived from a verified token.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject identifier - redacted in Debug output.
    pub subject: String,

    /// Role granted to the subject.
    pub role: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            subject: claims.sub.clone(),
            role: claims.role.clone(),
        }
    }
}

/// Per-request context travelling with the request through extensions.
///
/// Immutable: the filter produces a new value rather than mutating one in
/// place, so a context carrying an identity always came from a verified
/// token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    path: String,
    identity: Option<Identity>,
}

impl RequestContext {
    /// Context for an unauthenticated request to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            identity: None,
        }
    }

    /// A copy of this context carrying `identity`.
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            path: self.path.clone(),
            identity: Some(identity),
        }
    }

    /// Normalized request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Verified identity, if the route required one.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

/// Health check response.
///
/// Returned by the `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service health status.
    pub status: String,

    /// Gateway instance identifier.
    pub gateway_id: String,

    /// Number of configured routes.
    pub routes: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            subject: "7".to_string(),
            role: "ADMIN".to_string(),
        }
    }

    #[test]
    fn test_new_context_has_no_identity() {
        let ctx = RequestContext::new("/users/42");

        assert_eq!(ctx.path(), "/users/42");
        assert!(ctx.identity().is_none());
    }

    #[test]
    fn test_with_identity_leaves_original_untouched() {
        let ctx = RequestContext::new("/users/42");
        let enriched = ctx.with_identity(identity());

        assert!(ctx.identity().is_none());
        assert_eq!(enriched.identity(), Some(&identity()));
        assert_eq!(enriched.path(), "/users/42");
    }

    #[test]
    fn test_identity_debug_redacts_subject() {
        let id = Identity {
            subject: "user-123456".to_string(),
            role: "ADMIN".to_string(),
        };
        let debug_str = format!("{:?}", id);

        assert!(!debug_str.contains("user-123456"));
        assert!(debug_str.contains("ADMIN"));
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            gateway_id: "gk-test".to_string(),
            routes: 3,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["gateway_id"], "gk-test");
        assert_eq!(json["routes"], 3);
    }
}

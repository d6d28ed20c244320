//! Identity claims structure.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use crate::errors::AuthError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Claims carried by a verified identity token.
///
/// Identity services disagree on where the subject lives: most use `sub`,
/// some issue a numeric `id`. Both are accepted and normalized to a string.
#[derive(Clone, Serialize)]
pub struct Claims {
    /// Subject (user identifier) - redacted in Debug output.
    pub sub: String,

    /// Role granted to the subject, passed through to backends.
    pub role: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds), if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Every other payload field, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("role", &self.role)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("extra_fields", &self.extra.len())
            .finish()
    }
}

impl Claims {
    /// Build claims from a verified token payload.
    ///
    /// Fails with `Malformed` when the subject, role or expiration is
    /// missing or has the wrong shape.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, AuthError> {
        let sub = payload
            .remove("sub")
            .or_else(|| payload.remove("id"))
            .as_ref()
            .and_then(scalar_to_string)
            .ok_or(AuthError::Malformed)?;

        let role = payload
            .remove("role")
            .as_ref()
            .and_then(scalar_to_string)
            .ok_or(AuthError::Malformed)?;

        let exp = payload
            .remove("exp")
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or(AuthError::Malformed)?;

        let iat = payload.remove("iat").as_ref().and_then(Value::as_i64);

        Ok(Claims {
            sub,
            role,
            exp,
            iat,
            extra: payload,
        })
    }

    /// Whether the token is expired at `now` (Unix seconds). The expiry
    /// instant itself counts as expired.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Non-empty strings and numbers become strings; anything else is rejected.
fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

//! Builder patterns for test data construction
//!
//! Provides a fluent API for creating signed test tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Signing secret shared by [`crate::test_config`] and the token builder.
pub const TEST_SIGNING_SECRET: &str = "gatekeeper-test-signing-secret-0123456789";

/// Builder for creating signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_subject("7")
///     .with_role("ADMIN")
///     .expires_in(3600)
///     .sign(TEST_SIGNING_SECRET);
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
    iat: i64,
    algorithm: Algorithm,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            role: Some("USER".to_string()),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: now.timestamp(),
            algorithm: Algorithm::HS256,
            extra: Map::new(),
        }
    }

    /// Set the subject
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    /// Set expiration in seconds from now
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set expiration to `seconds` in the past
    pub fn expired_seconds_ago(self, seconds: i64) -> Self {
        self.expires_in(-seconds)
    }

    /// Set an exact expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = Some(timestamp);
        self
    }

    /// Drop a required claim (`sub`, `role` or `exp`)
    pub fn without(mut self, claim: &str) -> Self {
        match claim {
            "sub" => self.sub = None,
            "role" => self.role = None,
            "exp" => self.exp = None,
            _ => {
                self.extra.remove(claim);
            }
        }
        self
    }

    /// Add an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Sign with a different HMAC algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(&self) -> Value {
        let mut claims = self.extra.clone();
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(sub) = &self.sub {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(role) = &self.role {
            claims.insert("role".to_string(), json!(role));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        Value::Object(claims)
    }

    /// Build and sign the token
    pub fn sign(&self, secret: &str) -> String {
        encode(
            &Header::new(self.algorithm),
            &self.build(),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("test token signing should not fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_claims() {
        let claims = TestTokenBuilder::new()
            .for_subject("7")
            .with_role("ADMIN")
            .build();

        assert_eq!(claims["sub"], "7");
        assert_eq!(claims["role"], "ADMIN");
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_default() {
        let claims = TestTokenBuilder::default().build();
        assert_eq!(claims["sub"], "test-subject");
        assert_eq!(claims["role"], "USER");
    }

    #[test]
    fn test_without_removes_claim() {
        let claims = TestTokenBuilder::new().without("role").build();
        assert!(claims.get("role").is_none());
    }

    #[test]
    fn test_sign_produces_three_segments() {
        let token = TestTokenBuilder::new().sign(TEST_SIGNING_SECRET);
        assert_eq!(token.split('.').count(), 3);
    }
}

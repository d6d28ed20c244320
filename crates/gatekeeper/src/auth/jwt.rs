//! Identity token verification.
//!
//! Verifies HMAC-signed JWTs against the gateway's shared secret.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The algorithm is pinned by configuration; the token header is only
//!   compared against it, never used to choose one
//! - Expiration is checked without leeway: a token is dead at `exp`
//! - Callers receive a failure kind only; details go to debug logs

use crate::auth::claims::Claims;
use crate::errors::AuthError;
use common::jwt::{ensure_pinned_algorithm, HmacAlgorithm, JwtValidationError};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::fmt;
use tracing::instrument;

/// Decodes and verifies identity tokens.
///
/// Holds the verification key for the life of the process. Verification is
/// a pure function of the token, the key and the clock.
pub struct ClaimsCodec {
    decoding_key: DecodingKey,
    validation: Validation,
    algorithm: HmacAlgorithm,
}

impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("decoding_key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl ClaimsCodec {
    /// Create a codec for `algorithm` keyed with `secret`.
    pub fn new(secret: &SecretString, algorithm: HmacAlgorithm) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

        let mut validation = Validation::new(algorithm.algorithm());
        // Expiry is checked by the codec itself so the boundary is exact
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key,
            validation,
            algorithm,
        }
    }

    /// The algorithm every accepted token must declare.
    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    /// Verify a token against the current time.
    ///
    /// # Security Checks
    ///
    /// 1. Structure - size limit, three segments, decodable header
    /// 2. Algorithm - header `alg` must equal the pinned algorithm
    /// 3. Signature - HMAC over header and payload
    /// 4. Claims - subject, role and integer `exp` present
    /// 5. Expiration - `now < exp`
    ///
    /// # Errors
    ///
    /// - `Malformed` - structure, encoding or required claims are wrong
    /// - `BadSignature` - algorithm mismatch or signature mismatch
    /// - `Expired` - the token's `exp` is not in the future
    #[instrument(skip_all, name = "gk.auth.decode_and_verify")]
    pub fn decode_and_verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.decode_and_verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Deterministic variant of [`decode_and_verify`](Self::decode_and_verify)
    /// with an explicit `now` (Unix seconds).
    pub fn decode_and_verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        // 1-2. Structure and pinned algorithm (includes size check via common::jwt)
        ensure_pinned_algorithm(token, self.algorithm).map_err(|e| {
            tracing::debug!(target: "gk.auth.jwt", error = ?e, "Token header check failed");
            match e {
                JwtValidationError::AlgorithmMismatch => AuthError::BadSignature,
                JwtValidationError::TokenTooLarge
                | JwtValidationError::MalformedToken
                | JwtValidationError::MissingAlgorithm => AuthError::Malformed,
            }
        })?;

        // 3. Signature and payload decoding
        let token_data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(target: "gk.auth.jwt", error = %e, "Token verification failed");
                classify(e.kind())
            })?;

        // 4. Claims shape
        let claims = Claims::from_payload(token_data.claims).inspect_err(|_| {
            tracing::debug!(target: "gk.auth.jwt", "Token is missing identity claims");
        })?;

        // 5. Expiration
        if claims.is_expired_at(now) {
            tracing::debug!(
                target: "gk.auth.jwt",
                exp = claims.exp,
                now = now,
                "Token rejected: expired"
            );
            return Err(AuthError::Expired);
        }

        tracing::debug!(target: "gk.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

/// Map a `jsonwebtoken` failure onto the gateway's failure kinds.
fn classify(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Malformed,
    }
}

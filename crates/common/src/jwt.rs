//! JWT utilities shared across gateway components.
//!
//! This module provides the structural checks that run before any
//! cryptography:
//! - Size limits for DoS prevention
//! - Header parsing and `alg` extraction
//! - Algorithm pinning for HMAC-signed tokens
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The algorithm declared by a token is never trusted; it must equal the
//!   algorithm configured for the verifier (`none` is always rejected)
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{ensure_pinned_algorithm, HmacAlgorithm};
//!
//! // Reject algorithm confusion before signature verification
//! ensure_pinned_algorithm(token, HmacAlgorithm::Hs256)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any parsing or cryptographic
/// operations.
///
/// - Typical HMAC-signed identity tokens are 150-400 bytes
/// - 8KB allows generous custom claims while bounding base64 decode cost
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT checks.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token header is missing the `alg` field.
    #[error("The access token is invalid or expired")]
    MissingAlgorithm,

    /// Token header declares an algorithm other than the pinned one.
    #[error("The access token is invalid or expired")]
    AlgorithmMismatch,
}

// =============================================================================
// Algorithms
// =============================================================================

/// HMAC algorithms a shared-secret verifier may be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HmacAlgorithm {
    /// HMAC with SHA-256.
    #[default]
    Hs256,
    /// HMAC with SHA-384.
    Hs384,
    /// HMAC with SHA-512.
    Hs512,
}

impl HmacAlgorithm {
    /// The JOSE name of the algorithm as it appears in a token header.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    /// The matching `jsonwebtoken` algorithm.
    #[must_use]
    pub fn algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }

    /// Minimum secret length in bytes (the digest size of the hash).
    #[must_use]
    pub fn min_secret_len(self) -> usize {
        match self {
            Self::Hs256 => 32,
            Self::Hs384 => 48,
            Self::Hs512 => 64,
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HmacAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(format!(
                "unsupported algorithm '{other}', expected HS256, HS384 or HS512"
            )),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `alg` field from a JWT header without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The value must only be compared against a configured algorithm, never
///   used to select one
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds size limit (denial-of-service protection)
/// - `MalformedToken` - Token format invalid (wrong structure, bad base64, invalid JSON)
/// - `MissingAlgorithm` - Token header missing `alg` field or `alg` is not a string
pub fn extract_alg(token: &str) -> Result<String, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("alg")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingAlgorithm)
}

/// Check that a token's header declares exactly the pinned algorithm.
///
/// The comparison is case-sensitive, matching JOSE. A header declaring
/// `none`, a different HMAC size, or an asymmetric algorithm is rejected
/// with `AlgorithmMismatch`.
///
/// # Errors
///
/// Returns the errors of [`extract_alg`], or `AlgorithmMismatch` when the
/// declared algorithm differs from `expected`.
pub fn ensure_pinned_algorithm(
    token: &str,
    expected: HmacAlgorithm,
) -> Result<(), JwtValidationError> {
    let declared = extract_alg(token)?;

    if declared != expected.as_str() {
        tracing::debug!(
            target: "common.jwt",
            declared = %declared,
            expected = %expected,
            "Token rejected: algorithm does not match pinned algorithm"
        );
        return Err(JwtValidationError::AlgorithmMismatch);
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

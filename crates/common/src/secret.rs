//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the token signing secret and
//! any other credential the gateway handles. `SecretString` implements
//! `Debug` with redaction, so deriving `Debug` on a struct that holds one is
//! safe to log. Secrets are zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct SigningConfig {
//!     algorithm: &'static str,
//!     secret: SecretString,
//! }
//!
//! let config = SigningConfig {
//!     algorithm: "HS256",
//!     secret: SecretString::from("0123456789abcdef0123456789abcdef"),
//! };
//!
//! assert!(!format!("{config:?}").contains("0123456789abcdef"));
//! assert_eq!(config.secret.expose_secret().len(), 32);
//! ```
//!
//! Only call `expose_secret()` at the point where the raw bytes are handed to
//! a cryptographic primitive (e.g. building an HMAC key).

pub use secrecy::{ExposeSecret, SecretString};

/// Byte length of a secret without copying it out of its wrapper.
#[must_use]
pub fn secret_len(secret: &SecretString) -> usize {
    secret.expose_secret().len()
}

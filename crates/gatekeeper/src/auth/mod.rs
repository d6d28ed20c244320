//! Identity token handling.
//!
//! - [`claims`] - claims carried by a verified token
//! - [`jwt`] - the codec that decodes and verifies tokens

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::ClaimsCodec;

//! Middleware for the gateway.
//!
//! # Components
//!
//! - `auth` - Authentication filter applied before every backend dispatch
//! - `http_metrics` - HTTP metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthFilter, ClaimsExt};
pub use http_metrics::http_metrics_middleware;

//! Gatekeeper API Gateway Library
//!
//! A stateless HTTP gateway that sits in front of backend services and
//! decides, per request, whether a bearer token is required:
//!
//! - Route matching against configured path patterns (first match wins)
//! - Open routes forwarded without authentication
//! - HMAC-signed JWT verification on every other route
//! - Verified identity forwarded to backends as `id` and `role` headers
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/proxy.rs -> middleware/auth.rs -> services/backend.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Claims decoding and signature verification
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication filter and HTTP metrics
//! - `models` - Request context and response models
//! - `observability` - Prometheus metrics
//! - `policy` - Open-route policy and path canonicalization
//! - `routes` - Axum router setup and route table
//! - `services` - Backend dispatch

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod routes;
pub mod services;

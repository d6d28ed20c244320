//! Services used by the gateway.

pub mod backend;

pub use backend::{BackendClient, HttpBackend};

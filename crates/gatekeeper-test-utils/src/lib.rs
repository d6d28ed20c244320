//! # Gatekeeper Test Utilities
//!
//! Shared test utilities for the gateway.
//!
//! This crate provides:
//! - Server test harness (`TestGatewayServer` for E2E tests)
//! - Token builders (`TestTokenBuilder` for signed test tokens)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gatekeeper_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let backend = wiremock::MockServer::start().await;
//!     let config = test_config(&[("/users/**", &backend.uri())])?;
//!     let server = TestGatewayServer::spawn(config).await?;
//!
//!     let token = TestTokenBuilder::new().for_subject("7").sign(TEST_SIGNING_SECRET);
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/users/7", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use server_harness::*;
pub use token_builders::*;

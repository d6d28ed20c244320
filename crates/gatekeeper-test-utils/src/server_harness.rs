//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use crate::token_builders::TEST_SIGNING_SECRET;
use gatekeeper::config::Config;
use gatekeeper::observability::metrics::init_metrics_recorder;
use gatekeeper::routes::{self, AppState};
use gatekeeper::services::{BackendClient, HttpBackend};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;

/// The global recorder can only be installed once per process; every server
/// in a test binary shares it.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Build a test configuration routing each `(pattern, backend_url)` pair, in
/// order, with the default open routes and [`TEST_SIGNING_SECRET`].
pub fn test_config(routes: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
    test_config_with(routes, &[])
}

/// Like [`test_config`], with extra environment variables layered on top.
pub fn test_config_with(
    routes: &[(&str, &str)],
    overrides: &[(&str, &str)],
) -> Result<Config, anyhow::Error> {
    let routes = routes
        .iter()
        .map(|(pattern, url)| format!("{pattern}={url}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut vars = HashMap::from([
        ("JWT_SECRET".to_string(), TEST_SIGNING_SECRET.to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("GATEWAY_ROUTES".to_string(), routes),
        ("GATEWAY_ID".to_string(), "gk-test".to_string()),
        ("BACKEND_TIMEOUT_SECONDS".to_string(), "5".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    Config::from_vars(&vars).map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Test harness for spawning a gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestGatewayServer::spawn(test_config(&[("/**", "http://127.0.0.1:1")])?).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a gateway that forwards over HTTP to the configured backends.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs in
    /// the background until dropped.
    pub async fn spawn(config: Config) -> Result<Self, anyhow::Error> {
        let backend = HttpBackend::new(
            Duration::from_secs(config.backend_timeout_seconds),
            config.max_body_bytes,
        )
        .map_err(|e| anyhow::anyhow!("Failed to create backend client: {}", e))?;

        Self::spawn_with_backend(config, Arc::new(backend)).await
    }

    /// Spawn a gateway with a custom backend client (e.g. `MockBackend`).
    pub async fn spawn_with_backend(
        config: Config,
        backend: Arc<dyn BackendClient>,
    ) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::new(config.clone(), backend));

        // Build routes using the gateway's real route builder
        let app = routes::build_routes(state, metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends
        self._handle.abort();
    }
}

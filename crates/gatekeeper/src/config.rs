//! Gateway configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::jwt::HmacAlgorithm;
use common::secret::{secret_len, SecretString};
use reqwest::Url;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Paths reachable without a token unless `GATEWAY_OPEN_ROUTES` says otherwise.
pub const DEFAULT_OPEN_ROUTES: &[&str] = &["/auth/register", "/auth/login"];

/// Default backend request timeout in seconds.
pub const DEFAULT_BACKEND_TIMEOUT_SECONDS: u64 = 30;

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default gateway instance ID prefix.
pub const DEFAULT_GATEWAY_ID_PREFIX: &str = "gk";

/// A configured route: a path pattern and the backend that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Path pattern, e.g. `/users/**` or `/auth`.
    pub pattern: String,

    /// Base URL of the backend service.
    pub target: Url,
}

/// Gateway configuration.
///
/// Loaded from environment variables with sensible defaults.
/// The signing secret is redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Shared HMAC secret used to verify identity tokens.
    pub jwt_secret: SecretString,

    /// Algorithm every token must declare (default: HS256).
    pub jwt_algorithm: HmacAlgorithm,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Routes in match order.
    pub routes: Vec<RouteEntry>,

    /// Path patterns that bypass authentication.
    pub open_routes: Vec<String>,

    /// Backend request timeout in seconds (default: 30).
    pub backend_timeout_seconds: u64,

    /// Largest request body buffered for forwarding (default: 1 MiB).
    pub max_body_bytes: usize,

    /// Unique identifier for this gateway instance.
    pub gateway_id: String,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("bind_address", &self.bind_address)
            .field("routes", &self.routes)
            .field("open_routes", &self.open_routes)
            .field("backend_timeout_seconds", &self.backend_timeout_seconds)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("gateway_id", &self.gateway_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing secret: {0}")]
    InvalidSigningSecret(String),

    #[error("Invalid JWT algorithm: {0}")]
    InvalidJwtAlgorithm(String),

    #[error("Invalid route configuration: {0}")]
    InvalidRoute(String),

    #[error("Invalid backend timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid body limit configuration: {0}")]
    InvalidBodyLimit(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_algorithm = match vars.get("JWT_ALGORITHM") {
            Some(value) => value
                .parse::<HmacAlgorithm>()
                .map_err(ConfigError::InvalidJwtAlgorithm)?,
            None => HmacAlgorithm::default(),
        };

        let jwt_secret = SecretString::from(
            vars.get("JWT_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("JWT_SECRET".to_string()))?
                .clone(),
        );

        let min_len = jwt_algorithm.min_secret_len();
        if secret_len(&jwt_secret) < min_len {
            return Err(ConfigError::InvalidSigningSecret(format!(
                "JWT_SECRET must be at least {} bytes for {}",
                min_len, jwt_algorithm
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let routes = parse_routes(
            vars.get("GATEWAY_ROUTES")
                .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_ROUTES".to_string()))?,
        )?;

        let open_routes = match vars.get("GATEWAY_OPEN_ROUTES") {
            Some(value) => split_list(value),
            None => DEFAULT_OPEN_ROUTES.iter().map(|s| s.to_string()).collect(),
        };

        // Parse backend timeout with validation
        let backend_timeout_seconds = if let Some(value_str) = vars.get("BACKEND_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTimeout(format!(
                    "BACKEND_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "BACKEND_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_BACKEND_TIMEOUT_SECONDS
        };

        // Parse body limit with validation
        let max_body_bytes = if let Some(value_str) = vars.get("MAX_BODY_BYTES") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidBodyLimit(format!(
                    "MAX_BODY_BYTES must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidBodyLimit(
                    "MAX_BODY_BYTES must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_MAX_BODY_BYTES
        };

        let gateway_id = vars.get("GATEWAY_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{}-{}-{}", DEFAULT_GATEWAY_ID_PREFIX, hostname, short_suffix)
        });

        Ok(Config {
            jwt_secret,
            jwt_algorithm,
            bind_address,
            routes,
            open_routes,
            backend_timeout_seconds,
            max_body_bytes,
            gateway_id,
        })
    }
}

/// Split a comma-separated list, dropping blank entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parse `pattern=url` entries, keeping their order.
fn parse_routes(value: &str) -> Result<Vec<RouteEntry>, ConfigError> {
    let mut routes: Vec<RouteEntry> = Vec::new();

    for entry in split_list(value) {
        let (pattern, target) = entry.split_once('=').ok_or_else(|| {
            ConfigError::InvalidRoute(format!("expected 'pattern=url', got '{}'", entry))
        })?;
        let pattern = pattern.trim();
        let target = target.trim();

        if !pattern.starts_with('/') {
            return Err(ConfigError::InvalidRoute(format!(
                "pattern must start with '/', got '{}'",
                pattern
            )));
        }

        // Only a trailing "/**" glob is supported
        if pattern.trim_end_matches("/**").contains('*') {
            return Err(ConfigError::InvalidRoute(format!(
                "only a trailing '/**' wildcard is supported, got '{}'",
                pattern
            )));
        }

        if routes.iter().any(|r| r.pattern == pattern) {
            return Err(ConfigError::InvalidRoute(format!(
                "duplicate route pattern '{}'",
                pattern
            )));
        }

        let target = Url::parse(target).map_err(|e| {
            ConfigError::InvalidRoute(format!("invalid target URL for '{}': {}", pattern, e))
        })?;

        if !matches!(target.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRoute(format!(
                "target for '{}' must use http or https",
                pattern
            )));
        }

        routes.push(RouteEntry {
            pattern: pattern.to_string(),
            target,
        });
    }

    if routes.is_empty() {
        return Err(ConfigError::InvalidRoute(
            "GATEWAY_ROUTES must contain at least one route".to_string(),
        ));
    }

    Ok(routes)
}

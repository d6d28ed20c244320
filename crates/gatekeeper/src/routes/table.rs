//! Route table: path pattern to backend target.
//!
//! Patterns are path prefixes matched on segment boundaries. A trailing
//! `/**` is accepted for readability and means the same as the bare prefix:
//! `/users/**` and `/users` both match `/users` and `/users/42`, but not
//! `/usersettings`. `/` and `/**` match every path.

use crate::config::RouteEntry;
use crate::policy::RoutePolicy;
use reqwest::Url;

/// One configured route.
#[derive(Debug, Clone)]
pub struct Route {
    /// Pattern as configured, used in logs and metric labels.
    pub pattern: String,

    /// Base URL of the backend.
    pub target: Url,

    /// Whether the route prefix itself is secured by the route policy.
    /// Informational: the filter still decides per request path.
    pub requires_auth: bool,

    prefix: String,
}

impl Route {
    pub fn new(pattern: impl Into<String>, target: Url, requires_auth: bool) -> Self {
        let pattern = pattern.into();
        let prefix = pattern_prefix(&pattern);
        Self {
            pattern,
            target,
            requires_auth,
            prefix,
        }
    }

    /// Whether `path` falls under this route.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        path.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// `/users/**` -> `/users`, `/users/` -> `/users`, `/` and `/**` -> ``.
fn pattern_prefix(pattern: &str) -> String {
    pattern
        .trim_end_matches("/**")
        .trim_end_matches('/')
        .to_string()
}

/// Routes in configuration order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Build from configuration, deriving each route's `requires_auth`
    /// from `policy`.
    pub fn from_config(entries: &[RouteEntry], policy: &dyn RoutePolicy) -> Self {
        let routes = entries
            .iter()
            .map(|entry| {
                let prefix = pattern_prefix(&entry.pattern);
                let probe = if prefix.is_empty() { "/" } else { prefix.as_str() };
                Route::new(
                    entry.pattern.clone(),
                    entry.target.clone(),
                    policy.is_secured(probe),
                )
            })
            .collect();
        Self { routes }
    }

    /// First route matching `path`, in configuration order.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

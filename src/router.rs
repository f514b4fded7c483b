//! Route messages to named destinations by matcher expression.
//!
//! Routes are compiled once and shared read-only, so a batch of messages can
//! be routed in parallel.
//!
//! ```rust
//! use heka_matcher::{Message, Router};
//!
//! let router = Router::from_yaml_str(r#"
//! routes:
//!   - name: errors
//!     matcher: "Severity <= 3"
//!   - name: nginx
//!     matcher: "Logger == 'nginx'"
//! "#)?;
//!
//! let message = Message::default().with_logger("nginx").with_severity(2);
//! assert_eq!(router.route(&message), vec!["errors", "nginx"]);
//! # Ok::<(), heka_matcher::HekaError>(())
//! ```

use crate::config::MatcherConfig;
use crate::error::{HekaError, Result};
use crate::matcher::{MatchSource, MessageMatcher};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// A route as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub name: String,
    pub matcher: String,
}

impl RouteSpec {
    pub fn new(name: impl Into<String>, matcher: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matcher: matcher.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    #[serde(default)]
    matcher: MatcherConfig,
    routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone)]
struct Route {
    name: String,
    matcher: MessageMatcher,
}

/// An ordered set of compiled routes.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Load routes from YAML: a `routes` list of `{name, matcher}` entries and
    /// optional `matcher` limits.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: RouteFile = serde_yaml::from_str(yaml)?;
        Self::from_routes_with_config(file.routes, &file.matcher)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn from_routes(routes: impl IntoIterator<Item = RouteSpec>) -> Result<Self> {
        Self::from_routes_with_config(routes, &MatcherConfig::default())
    }

    /// Compile every route. Route names must be unique.
    pub fn from_routes_with_config(
        routes: impl IntoIterator<Item = RouteSpec>,
        config: &MatcherConfig,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::new();

        for spec in routes {
            if !seen.insert(spec.name.clone()) {
                return Err(HekaError::InvalidConfig(format!(
                    "duplicate route name: {}",
                    spec.name
                )));
            }
            let matcher = MessageMatcher::compile_with_config(&spec.matcher, config)
                .map_err(|err| {
                    warn!(route = %spec.name, error = %err, "route matcher rejected");
                    err
                })?;
            debug!(route = %spec.name, nodes = matcher.node_count(), "compiled route");
            compiled.push(Route {
                name: spec.name,
                matcher,
            });
        }

        Ok(Self { routes: compiled })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route names in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.name.as_str())
    }

    pub fn matcher(&self, name: &str) -> Option<&MessageMatcher> {
        self.routes
            .iter()
            .find(|route| route.name == name)
            .map(|route| &route.matcher)
    }

    /// Names of the routes whose matcher accepts `message`, in configuration
    /// order.
    pub fn route<S: MatchSource + ?Sized>(&self, message: &S) -> Vec<&str> {
        self.routes
            .iter()
            .filter(|route| route.matcher.evaluate(message))
            .map(|route| route.name.as_str())
            .collect()
    }

    /// Route many messages in parallel. Results are in input order.
    pub fn route_batch<S: MatchSource + Sync>(&self, messages: &[S]) -> Vec<Vec<&str>> {
        messages
            .par_iter()
            .map(|message| self.route(message))
            .collect()
    }
}

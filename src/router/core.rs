//! Route table core: pattern compilation, registration and matching.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::dispatcher::Handler;
use crate::error::{ConfigError, HandlerError};
use crate::server::request::is_normalized_method;
use crate::server::{HandlerRequest, Reply};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted path parameters, in pattern order. Names are shared with the route.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A compiled path pattern such as `/users/:id` or `/users/{id}`.
#[derive(Clone)]
pub struct PathPattern {
    /// Pattern as registered
    raw: String,
    /// Canonical form used for identity: `{name}` is rewritten to `:name` and empty
    /// segments are dropped
    canonical: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile a pattern into an anchored regex and its ordered parameter names.
    ///
    /// Static segments match literally; `:name` and `{name}` match exactly one
    /// non-empty segment.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut regex_src = String::with_capacity(pattern.len() + 8);
        regex_src.push('^');
        let mut canonical = String::with_capacity(pattern.len());
        let mut param_names: Vec<Arc<str>> = Vec::new();

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            let param = if let Some(name) = segment.strip_prefix(':') {
                Some(name)
            } else if segment.starts_with('{') && segment.ends_with('}') {
                Some(&segment[1..segment.len() - 1])
            } else {
                None
            };

            match param {
                Some(name) => {
                    if name.is_empty() {
                        return Err(invalid("parameter segment has no name"));
                    }
                    if param_names.iter().any(|p| p.as_ref() == name) {
                        return Err(invalid("parameter name used twice"));
                    }
                    regex_src.push_str("/([^/]+)");
                    canonical.push_str("/:");
                    canonical.push_str(name);
                    param_names.push(Arc::from(name));
                }
                None => {
                    if segment.contains(['{', '}']) {
                        return Err(invalid("unbalanced braces in segment"));
                    }
                    regex_src.push('/');
                    regex_src.push_str(&regex::escape(segment));
                    canonical.push('/');
                    canonical.push_str(segment);
                }
            }
        }

        if canonical.is_empty() {
            regex_src.push('/');
            canonical.push('/');
        }
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            raw: pattern.to_string(),
            canonical,
            regex,
            param_names,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match a request path (no query string), returning decoded parameters.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                let value = urlencoding::decode(m.as_str())
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| m.as_str().to_string());
                params.push((Arc::clone(name), value));
            }
        }
        Some(params)
    }

    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPattern")
            .field("raw", &self.raw)
            .field("params", &self.param_names)
            .finish()
    }
}

/// A registered (method, pattern, handler) entry. Immutable once registered.
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Path parameters extracted from the URL (e.g., `:id` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Collects routes during the configuration phase.
///
/// Consumed by [`RouteTableBuilder::build`]; the resulting [`RouteTable`] cannot be
/// extended, so no route can be added once serving begins.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
}

impl RouteTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `pattern`.
    ///
    /// Fails with [`ConfigError::DuplicateRoute`] if the same method already has a route
    /// with an equivalent pattern, [`ConfigError::InvalidPattern`] if the pattern does
    /// not compile, or [`ConfigError::InvalidMethod`] if the method has lowercase letters
    /// (requests are normalized to upper case, so such a route could never match).
    pub fn register<F, Fut, R>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, ConfigError>
    where
        F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        self.register_arc(method, pattern, Arc::new(handler))
    }

    /// Same as [`RouteTableBuilder::register`] for an already shared handler.
    pub fn register_arc(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, ConfigError> {
        if !is_normalized_method(&method) {
            return Err(ConfigError::InvalidMethod {
                method: method.to_string(),
            });
        }
        let pattern = PathPattern::parse(pattern)?;
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern.canonical() == pattern.canonical())
        {
            return Err(ConfigError::DuplicateRoute {
                method: method.to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }

        debug!(
            method = %method,
            pattern = %pattern.as_str(),
            params = ?pattern.param_names(),
            "Route registered"
        );
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Freeze the table for serving.
    #[must_use]
    pub fn build(self) -> RouteTable {
        let routes: Vec<Arc<Route>> = self.routes.into_iter().map(Arc::new).collect();
        let mut by_method: HashMap<Method, Vec<usize>> = HashMap::new();
        for (idx, route) in routes.iter().enumerate() {
            by_method.entry(route.method.clone()).or_default().push(idx);
        }

        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method, r.pattern.as_str()))
            .collect();
        info!(
            routes_count = routes.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        RouteTable { routes, by_method }
    }
}

/// Read-only routing table used while serving.
///
/// Routes are kept in registration order; when patterns overlap the first registered
/// route wins. Safe to share between any number of concurrent requests.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    /// Indexes into `routes` per method, in registration order
    by_method: HashMap<Method, Vec<usize>>,
}

impl RouteTable {
    /// Match a request to a route.
    ///
    /// The path is compared case-sensitively and must not contain the query string.
    /// Returns `None` when nothing matches; the caller decides the not-found response.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let candidates = self.by_method.get(method)?;
        let found = candidates.iter().find_map(|&idx| {
            let route = &self.routes[idx];
            route.pattern.captures(path).map(|path_params| RouteMatch {
                route: Arc::clone(route),
                path_params,
            })
        });

        match &found {
            Some(m) => debug!(
                method = %method,
                path = %path,
                route_pattern = %m.route.pattern.as_str(),
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    /// Find the route that answers a HEAD request for `path` in preflight mode.
    ///
    /// Preference order: an explicit HEAD route, then a GET route, then any other route
    /// whose pattern matches, in registration order.
    #[must_use]
    pub fn resolve_head(&self, path: &str) -> Option<RouteMatch> {
        if let Some(m) = self.match_route(&Method::HEAD, path) {
            return Some(m);
        }
        if let Some(m) = self.match_route(&Method::GET, path) {
            return Some(m);
        }
        self.routes
            .iter()
            .filter(|r| r.method != Method::HEAD && r.method != Method::GET)
            .find_map(|route| {
                route.pattern.captures(path).map(|path_params| RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                })
            })
    }

    /// Methods with at least one route matching `path`, in registration order.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in &self.routes {
            if !methods.contains(&route.method) && route.pattern.is_match(path) {
                methods.push(route.method.clone());
            }
        }
        methods
    }

    /// Routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter()).finish()
    }
}

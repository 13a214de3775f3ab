use std::cmp::Ordering;
use std::sync::Arc;

use crate::handler::SharedHandler;
use crate::http::request::Method;

/// The method half of a route: one method, or any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Exact(Method),
    Any,
}

impl RouteMethod {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            RouteMethod::Exact(m) => m == method,
            RouteMethod::Any => true,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RouteMethod::Exact(m) => m.as_str(),
            RouteMethod::Any => "*",
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Exact(method)
    }
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Named methods sort by name; the wildcard sorts after all of them so a
// specific route on the same path is tried first.
impl Ord for RouteMethod {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RouteMethod::Exact(a), RouteMethod::Exact(b)) => a.as_str().cmp(b.as_str()),
            (RouteMethod::Exact(_), RouteMethod::Any) => Ordering::Less,
            (RouteMethod::Any, RouteMethod::Exact(_)) => Ordering::Greater,
            (RouteMethod::Any, RouteMethod::Any) => Ordering::Equal,
        }
    }
}

impl PartialOrd for RouteMethod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch {
    Matched,
    MethodMismatch,
    PathMismatch,
}

#[derive(Clone)]
pub struct Route {
    pub method: RouteMethod,
    pub path: String,
    pub handlers: Vec<SharedHandler>,
}

impl Route {
    pub fn new(method: RouteMethod, path: impl Into<String>, handlers: Vec<SharedHandler>) -> Self {
        Self {
            method,
            path: path.into(),
            handlers,
        }
    }

    pub fn matches(&self, method: &Method, path: &str) -> RouteMatch {
        let path = path.strip_prefix('/').unwrap_or(path);
        let prefix = self.path.strip_prefix('/').unwrap_or(&self.path);

        if !path_has_prefix(path, prefix) {
            RouteMatch::PathMismatch
        } else if self.method.matches(method) {
            RouteMatch::Matched
        } else {
            RouteMatch::MethodMismatch
        }
    }

    pub(crate) fn handlers(&self) -> impl Iterator<Item = SharedHandler> + '_ {
        self.handlers.iter().map(Arc::clone)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Whether `prefix` selects `path`.
///
/// A prefix ending in `/` (or an empty one) takes every path below it. Any
/// other prefix takes only the exact path, optionally followed by a query
/// string.
///
/// ```
/// # use plainhttp::router::route::path_has_prefix;
/// assert!(path_has_prefix("abc", "abc"));
/// assert!(path_has_prefix("abc?x=1", "abc"));
/// assert!(!path_has_prefix("abc/def", "abc"));
/// assert!(path_has_prefix("abc/def", "abc/"));
/// assert!(!path_has_prefix("abc", "abc/"));
/// ```
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };

    prefix.is_empty() || prefix.ends_with('/') || rest.is_empty() || rest.starts_with('?')
}

/// Most specific first: longer prefixes, then method, then path.
pub(crate) fn route_order(a: &Route, b: &Route) -> Ordering {
    b.path
        .len()
        .cmp(&a.path.len())
        .then_with(|| a.method.cmp(&b.method))
        .then_with(|| a.path.cmp(&b.path))
}

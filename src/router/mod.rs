//! Prefix router.
//!
//! Routes are registered up front and kept sorted most-specific-first, so
//! the first route whose prefix and method both match wins regardless of
//! registration order. Once the router is handed to a server it sits behind
//! an `Arc` and can no longer be modified.

pub mod route;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::handler::{Context, Handler, SharedHandler};
use crate::http::error::RouteError;
use crate::http::request::Method;
use crate::http::response::StatusCode;

pub use route::{Route, RouteMatch, RouteMethod};

/// Clones share the route table; registering on a clone copies it first.
#[derive(Clone)]
pub struct Router {
    table: Arc<RouteTable>,
    middlewares: Vec<SharedHandler>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base", &self.table.base)
            .field("routes", &self.table.routes)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// The sorted routes plus the base path they are relative to. Serving a
/// table is the dispatch step of the router.
#[derive(Clone)]
struct RouteTable {
    base: String,
    routes: Vec<Route>,
}

impl Router {
    /// A router for targets under `base` (usually `/`).
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            table: Arc::new(RouteTable {
                base: base.into(),
                routes: Vec::new(),
            }),
            middlewares: Vec::new(),
        }
    }

    /// Registers `handlers` for `method` on `path`. The last handler is the
    /// one expected to respond; the ones before it are route middlewares.
    pub fn handle(
        &mut self,
        method: impl Into<RouteMethod>,
        path: impl Into<String>,
        handlers: Vec<SharedHandler>,
    ) -> Result<&mut Self, RouteError> {
        let method = method.into();
        let path = path.into();

        if handlers.is_empty() {
            return Err(RouteError::NoHandlers {
                method: method.to_string(),
                path,
            });
        }

        let table = Arc::make_mut(&mut self.table);
        if table.routes.iter().any(|r| r.method == method && r.path == path) {
            return Err(RouteError::Duplicate {
                method: method.to_string(),
                path,
            });
        }

        debug!(%method, %path, "route registered");
        table.routes.push(Route::new(method, path, handlers));
        table.routes.sort_by(route::route_order);
        Ok(self)
    }

    pub fn get(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.handle(Method::GET, path, vec![Arc::new(handler)])
    }

    pub fn post(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.handle(Method::POST, path, vec![Arc::new(handler)])
    }

    pub fn put(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.handle(Method::PUT, path, vec![Arc::new(handler)])
    }

    pub fn delete(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.handle(Method::DELETE, path, vec![Arc::new(handler)])
    }

    /// Registers `handler` for every method on `path`.
    pub fn any(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RouteError> {
        self.handle(RouteMethod::Any, path, vec![Arc::new(handler)])
    }

    /// Adds a middleware that runs before routing, for every request.
    pub fn use_middleware(&mut self, middleware: impl Handler) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Registered routes in matching order.
    pub fn routes(&self) -> &[Route] {
        &self.table.routes
    }
}

impl Handler for Router {
    fn serve(&self, ctx: &mut Context) {
        let dispatch: SharedHandler = self.table.clone();
        ctx.extend_chain(self.middlewares.iter().cloned().chain([dispatch]));
        ctx.next();
    }
}

impl RouteTable {
    /// Strips the base path, which must end at a segment boundary unless it
    /// already ends with `/`.
    fn relative_path<'a>(&self, target: &'a str) -> Option<&'a str> {
        let rest = target.strip_prefix(self.base.as_str())?;
        let at_boundary = rest.is_empty() || rest.starts_with('/') || rest.starts_with('?');
        if self.base.ends_with('/') || at_boundary {
            Some(rest)
        } else {
            None
        }
    }
}

impl Handler for RouteTable {
    fn serve(&self, ctx: &mut Context) {
        let version = ctx.request.version.clone();

        let Some(path) = self.relative_path(&ctx.request.target) else {
            warn!(
                base = %self.base,
                target = %ctx.request.target,
                "target outside router base path"
            );
            ctx.response.set_status_line(&version, StatusCode::NotFound);
            return;
        };

        let mut allowed = Vec::new();
        for route in &self.routes {
            match route.matches(&ctx.request.method, path) {
                RouteMatch::Matched => {
                    debug!(method = %route.method, path = %route.path, "route matched");
                    ctx.extend_chain(route.handlers());
                    ctx.next();
                    return;
                }
                RouteMatch::MethodMismatch => allowed.push(route.method.as_str().to_string()),
                RouteMatch::PathMismatch => {}
            }
        }

        if allowed.is_empty() {
            ctx.response.set_status_line(&version, StatusCode::NotFound);
        } else {
            allowed.sort();
            allowed.dedup();
            ctx.response.set_status_line(&version, StatusCode::MethodNotAllowed);
            ctx.response.set_header("Allow", allowed.join(", "));
        }
    }
}

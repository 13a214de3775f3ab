//! Request handlers and the middleware chain.
//!
//! Everything that processes a request is a [`Handler`]: terminal responders
//! that fill in the response and stop, middlewares that wrap code around a
//! call to [`Context::next`], and the router, which adds the matched route's
//! handlers to the chain and continues.
//!
//! ```text
//! Logger ─▶ Recovery ─▶ Router ─▶ dispatch ─▶ route handlers
//!   ▲          ▲                                   │
//!   └──────────┴──────── returns after next() ◀────┘
//! ```

pub mod context;
pub mod echo;
pub mod files;
pub mod middleware;
pub mod range;
pub mod redirect;

use std::sync::Arc;

pub use context::Context;
pub use echo::EchoHandler;
pub use files::FileServer;
pub use middleware::{Logger, Recovery};
pub use redirect::RedirectToHttps;

/// Processes a [`Context`], optionally resuming the chain with
/// [`Context::next`].
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn serve(&self, ctx: &mut Context) {
        self(ctx)
    }
}

pub type SharedHandler = Arc<dyn Handler>;

/// Wraps a closure as a shared handler, with the argument type inferred.
pub fn handler_fn<F>(f: F) -> SharedHandler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An ordered list of handlers bound onto the context as a unit.
///
/// Serving a `Chain` inserts its handlers at the current chain position and
/// starts them, so `Chain::new().then(Logger).then(app)` runs `Logger`
/// around `app`.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<SharedHandler>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, handler: impl Handler) -> Self {
        self.then_shared(Arc::new(handler))
    }

    pub fn then_shared(mut self, handler: SharedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Handler for Chain {
    fn serve(&self, ctx: &mut Context) {
        ctx.extend_chain(self.handlers.iter().cloned());
        ctx.next();
    }
}

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{error, info};

use crate::handler::{Context, Handler};
use crate::http::response::StatusCode;

/// Logs one line per request once everything downstream has finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

impl Handler for Logger {
    fn serve(&self, ctx: &mut Context) {
        let start = Instant::now();
        ctx.next();

        info!(
            method = %ctx.request.method,
            target = %ctx.request.target,
            status = ctx.response.status.as_u16(),
            elapsed = ?start.elapsed(),
            "request served"
        );
    }
}

/// Turns a panic anywhere downstream into a `500 Internal Server Error`.
///
/// With `expose_panic` the body carries the panic message, which is useful
/// while developing and leaks internals in production.
#[derive(Debug, Clone, Copy)]
pub struct Recovery {
    expose_panic: bool,
}

impl Recovery {
    pub fn new(expose_panic: bool) -> Self {
        Self { expose_panic }
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Handler for Recovery {
    fn serve(&self, ctx: &mut Context) {
        let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| ctx.next())) else {
            return;
        };

        let message = panic_message(payload.as_ref());
        error!(
            method = %ctx.request.method,
            target = %ctx.request.target,
            panic = %message,
            "recovered from handler panic"
        );

        let version = ctx.request.version.clone();
        ctx.response.set_status_line(&version, StatusCode::InternalServerError);
        ctx.response.body.clear();
        if self.expose_panic {
            ctx.response.write(format!("panic: {message}"));
        } else {
            ctx.response.write("500 Internal Server Error");
        }
        ctx.abort();
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

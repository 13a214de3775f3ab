use std::fmt::Write;

use crate::handler::{Context, Handler};
use crate::http::response::StatusCode;

/// Answers with the request itself: request line, headers, a blank line,
/// then the body, as `text/plain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn serve(&self, ctx: &mut Context) {
        let req = &ctx.request;
        let mut head = String::new();

        let _ = write!(head, "{} {} {}\r\n", req.method, req.target, req.version);
        for (k, v) in &req.headers {
            let _ = write!(head, "{k}: {v}\r\n");
        }
        head.push_str("\r\n");
        let body = req.body.clone();

        let version = req.version.clone();
        ctx.response.set_status_line(&version, StatusCode::Ok);
        ctx.response.set_header("Content-Type", "text/plain");
        ctx.response.write(head);
        ctx.response.write(body);
    }
}

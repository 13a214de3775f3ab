use tracing::debug;
use url::Url;

use crate::handler::{Context, Handler};
use crate::http::response::StatusCode;

/// Sends every request to the same target on `https://`.
///
/// The `Host` header supplies the host name; its port, if any, is replaced
/// by `https_port` (omitted when it is 443).
#[derive(Debug, Clone, Copy)]
pub struct RedirectToHttps {
    https_port: u16,
}

impl RedirectToHttps {
    pub fn new(https_port: u16) -> Self {
        Self { https_port }
    }

    /// The `Location` for `target` on `host`, or `None` if the two do not
    /// form a valid URL.
    pub fn location(&self, host: &str, target: &str) -> Option<String> {
        let host = strip_port(host);
        let mut url = Url::parse(&format!("https://{host}")).ok()?;
        if self.https_port != 443 {
            url.set_port(Some(self.https_port)).ok()?;
        }
        let url = url.join(target).ok()?;
        Some(url.to_string())
    }
}

impl Default for RedirectToHttps {
    fn default() -> Self {
        Self::new(443)
    }
}

impl Handler for RedirectToHttps {
    fn serve(&self, ctx: &mut Context) {
        let location = ctx
            .request
            .header("Host")
            .and_then(|host| self.location(host, &ctx.request.target));

        let Some(location) = location else {
            ctx.response_text(StatusCode::BadRequest, "missing or invalid Host header");
            return;
        };

        debug!(target = %ctx.request.target, %location, "redirecting to https");
        let version = ctx.request.version.clone();
        ctx.response.set_status_line(&version, StatusCode::MovedPermanently);
        ctx.response.set_header("Location", location);
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literals keep their colons
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    match host.rsplit_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

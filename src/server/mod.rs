//! Accepting connections and handing each one to its own task.

pub mod listener;
pub mod tls;

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use crate::handler::{Handler, SharedHandler};
use crate::http::connection::Connection;
use crate::http::parser::ParserConfig;

/// Per-server settings shared by every connection.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub parser: ParserConfig,
    /// Include the panic message in 500 responses produced for a panic no
    /// middleware caught.
    pub debug_panic_response: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            debug_panic_response: true,
        }
    }
}

/// A handler plus the options it is served with.
///
/// One `Server` can back several listeners at once, e.g. plaintext and TLS.
pub struct Server {
    handler: SharedHandler,
    options: ServerOptions,
}

impl Server {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: Arc::new(handler),
            options: ServerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Serves a single request on `stream` and closes it.
    pub async fn serve_connection<S>(&self, stream: S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        Connection::new(stream, Arc::clone(&self.handler), self.options)
            .run()
            .await
    }

    pub async fn listen_and_serve(self: Arc<Self>, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        listener::run(listener, self).await
    }

    pub async fn listen_and_serve_tls(
        self: Arc<Self>,
        addr: &str,
        cert_path: &Path,
        key_path: &Path,
    ) -> anyhow::Result<()> {
        let config = tls::load_tls_config(cert_path, key_path)?;
        let listener = TcpListener::bind(addr).await?;
        listener::run_tls(listener, tokio_rustls::TlsAcceptor::from(config), self).await
    }
}

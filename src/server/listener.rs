use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::server::Server;

/// Pause after an accept error that is not tied to a single connection,
/// e.g. running out of file descriptors, so the loop does not spin.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A source of accepted connections.
pub trait Incoming: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Incoming for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accepts plaintext connections forever, spawning one task per
/// connection.
pub async fn run(listener: TcpListener, server: Arc<Server>) -> anyhow::Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    serve_incoming(listener, server).await;
    Ok(())
}

/// Serves every connection `incoming` yields. Accept errors are logged and
/// never end the loop.
pub async fn serve_incoming<I: Incoming>(mut incoming: I, server: Arc<Server>) {
    loop {
        let (socket, peer) = next_connection(&mut incoming).await;
        debug!("Accepted connection from {}", peer);

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = server.serve_connection(socket).await {
                warn!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

/// Like [`run`], with a TLS handshake at the start of each connection's
/// task so a slow handshake never holds up the accept loop.
pub async fn run_tls(
    mut listener: TcpListener,
    acceptor: TlsAcceptor,
    server: Arc<Server>,
) -> anyhow::Result<()> {
    info!("Listening (TLS) on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = next_connection(&mut listener).await;
        debug!("Accepted TLS connection from {}", peer);

        let acceptor = acceptor.clone();
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            let stream = match acceptor.accept(socket).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("TLS handshake with {} failed: {}", peer, e);
                    return;
                }
            };

            if let Err(e) = server.serve_connection(stream).await {
                warn!("Connection error from {}: {}", peer, e);
            }
        });
    }
}

async fn next_connection<I: Incoming>(incoming: &mut I) -> (I::Stream, SocketAddr) {
    loop {
        match incoming.accept().await {
            Ok(conn) => return conn,
            Err(e) if is_connection_error(&e) => {
                debug!(cause = %e, "connection dropped before accept");
            }
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

// errors that only concern the connection being accepted
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

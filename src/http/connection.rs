use std::any::Any;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

use crate::handler::middleware::panic_message;
use crate::handler::{Context, SharedHandler};
use crate::http::error::ParseError;
use crate::http::parser::parse_http_request;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::ServerOptions;

/// One accepted connection, serving exactly one request.
///
/// Whatever happens while reading or handling the request, the connection
/// writes one response and closes. A panic that escaped the handler chain is
/// answered with a bare 500 and then resumed on the calling task once the
/// stream is closed.
pub struct Connection<S> {
    stream: BufReader<S>,
    handler: SharedHandler,
    options: ServerOptions,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Context),
    Writing(ResponseWriter),
    Closed,
}

type PanicPayload = Box<dyn Any + Send + 'static>;

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, handler: SharedHandler, options: ServerOptions) -> Self {
        Self {
            stream: BufReader::new(stream),
            handler,
            options,
            state: ConnectionState::Reading,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut fault = None;
        let mut written = Ok(());

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(request) => {
                            let mut response = Response::new();
                            response.version = request.version.clone();
                            ConnectionState::Processing(Context::new(request, response))
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                timeout = e.is_timeout(),
                                "rejecting unreadable request"
                            );
                            let mut response = Response::bad_request();
                            ConnectionState::Writing(ResponseWriter::new(&mut response))
                        }
                    };
                }

                ConnectionState::Processing(ctx) => {
                    let handler = Arc::clone(&self.handler);
                    let expose_panic = self.options.debug_panic_response;
                    let (mut response, panic) = dispatch(handler, ctx, expose_panic).await;
                    fault = panic;
                    self.state = ConnectionState::Writing(ResponseWriter::new(&mut response));
                }

                ConnectionState::Writing(mut writer) => {
                    let stream = self.stream.get_mut();
                    written = writer.write_to_stream(stream).await;
                    if let Err(e) = stream.shutdown().await {
                        debug!(error = %e, "shutdown failed");
                    }
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => break,
            }
        }

        drop(self);
        if let Some(payload) = fault {
            std::panic::resume_unwind(payload);
        }
        written
    }

    async fn read_request(&mut self) -> Result<Request, ParseError> {
        parse_http_request(&mut self.stream, &self.options.parser).await
    }
}

/// Runs the handler chain on the blocking pool and hands back the
/// response, or a 500 plus the panic payload if the chain panicked.
async fn dispatch(
    handler: SharedHandler,
    mut ctx: Context,
    expose_panic: bool,
) -> (Response, Option<PanicPayload>) {
    let task = tokio::task::spawn_blocking(move || {
        ctx.extend_chain([handler]);
        ctx.next();
        ctx.response
    });

    match task.await {
        Ok(response) => (response, None),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = panic_message(payload.as_ref());
            error!(panic = %message, "handler chain panicked");

            let mut response = Response::internal_error();
            if expose_panic {
                response.body.clear();
                response.write(format!("panic: {message}"));
            }
            (response, Some(payload))
        }
        Err(e) => {
            error!(error = %e, "handler chain did not complete");
            (Response::internal_error(), None)
        }
    }
}

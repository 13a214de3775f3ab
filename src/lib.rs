//! plainhttp - a small HTTP/1.x server engine
//!
//! Requests are parsed by hand from the byte stream, run through a chain of
//! handlers (middlewares, a prefix router, responders) and written back
//! with a computed `Content-Length`, one request per connection.

pub mod config;
pub mod handler;
pub mod http;
pub mod router;
pub mod server;

//! HTTP/1.x wire handling.
//!
//! One connection carries one request. Each accepted connection goes
//! through a fixed sequence of states:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Request line, headers, body; each read has a deadline
//!        └──────┬──────┘
//!               │ Request parsed            (parse error → 400, skip to Writing)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Handler chain runs on the blocking pool
//!        └──────┬───────────┘
//!               │ Response ready            (uncaught panic → 500)
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Content-Length recomputed, response sent
//!        └──────┬───────────┘
//!               │
//!               ▼
//!             Closed
//! ```
//!
//! - **`scanner`**: deadline-bounded line and body reads
//! - **`parser`**: builds a [`request::Request`] from scanned lines
//! - **`request`** / **`response`**: the message models
//! - **`writer`**: serializes a response onto the stream
//! - **`connection`**: the state machine above
//! - **`mime`**: content types by file extension
//! - **`error`**: parse, route and range errors

pub mod connection;
pub mod error;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod scanner;
pub mod writer;

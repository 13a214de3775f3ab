use std::io;

use thiserror::Error;

use crate::http::response::StatusCode;

/// The read that was in flight when a deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    RequestLine,
    Header,
    Body,
}

impl std::fmt::Display for ReadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReadStage::RequestLine => "request line",
            ReadStage::Header => "header line",
            ReadStage::Body => "body",
        };
        f.write_str(name)
    }
}

/// Errors raised while reading a request off the wire.
///
/// Every variant is answered with `400 Bad Request`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {line:?}")]
    MalformedRequestLine { line: String },

    #[error("malformed header line: {line:?}")]
    MalformedHeader { line: String },

    #[error("invalid content-length: {value:?}")]
    InvalidContentLength { value: String },

    #[error("timed out reading {stage}")]
    Timeout { stage: ReadStage },

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("body of {length} bytes exceeds the limit of {limit}")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("connection closed while reading {stage}")]
    UnexpectedEof { stage: ReadStage },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ParseError::Timeout { .. })
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BadRequest
    }
}

/// Route table configuration errors. These are raised during registration
/// and are meant to abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("duplicate route: {method} {path}")]
    Duplicate { method: String, path: String },

    #[error("route {method} {path} has no handlers")]
    NoHandlers { method: String, path: String },
}

/// Failures while resolving a `Range` header against a file size.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed range header: {0:?}")]
    Syntax(String),

    #[error("range {range:?} not satisfiable for {size} bytes")]
    Unsatisfiable { range: String, size: u64 },
}

impl RangeError {
    pub fn status(&self) -> StatusCode {
        match self {
            RangeError::Syntax(_) => StatusCode::BadRequest,
            RangeError::Unsatisfiable { .. } => StatusCode::RangeNotSatisfiable,
        }
    }
}

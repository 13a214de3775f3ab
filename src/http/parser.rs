use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncBufRead;

use crate::http::error::{ParseError, ReadStage};
use crate::http::request::{Method, Request};
use crate::http::scanner::Scanner;

/// Deadlines and size limits applied while reading one request.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// Deadline for the request line and for each header line.
    pub line_timeout: Duration,
    /// Deadline for filling the body.
    pub body_timeout: Duration,
    pub max_line_length: usize,
    pub max_body_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_millis(3000),
            body_timeout: Duration::from_millis(3000),
            max_line_length: 8 * 1024,
            max_body_size: 16 * 1024 * 1024,
        }
    }
}

/// Reads and parses one request from `reader`.
///
/// The request line and every header line are each read under
/// `line_timeout`; the body, framed only by `Content-Length`, under
/// `body_timeout`. The first failure aborts the parse.
pub async fn parse_http_request<R>(reader: R, config: &ParserConfig) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut scanner = Scanner::new(reader, config.max_line_length);

    // Request line
    let line = scanner.read_line(config.line_timeout, ReadStage::RequestLine).await?;
    let (method, target, version) = parse_request_line(&line)?;

    // Headers
    let mut headers = HashMap::new();
    loop {
        let line = scanner.read_line(config.line_timeout, ReadStage::Header).await?;
        if line.is_empty() {
            break;
        }

        let (key, value) = parse_header_line(&line)?;
        headers.insert(key, value);
    }

    // Body
    let body = match headers.get("Content-Length") {
        None => Bytes::new(),
        Some(value) => {
            let length = value
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength { value: value.clone() })?;

            if length > config.max_body_size {
                return Err(ParseError::BodyTooLarge {
                    length,
                    limit: config.max_body_size,
                });
            }

            scanner.read_body(length, config.body_timeout).await?
        }
    };

    Ok(Request {
        method,
        target,
        version,
        headers,
        body,
    })
}

/// Splits `METHOD TARGET VERSION`. Anything but exactly three
/// space-separated tokens is rejected.
pub fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
    let malformed = || ParseError::MalformedRequestLine {
        line: line.to_string(),
    };

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };

    if target.is_empty() || version.is_empty() {
        return Err(malformed());
    }

    let method = Method::from_str(method).ok_or_else(malformed)?;
    Ok((method, target.to_string(), version.to_string()))
}

/// Splits a header line on its first colon and trims both sides.
pub fn parse_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (key, value) = line.split_once(':').ok_or_else(|| ParseError::MalformedHeader {
        line: line.to_string(),
    })?;

    Ok((key.trim().to_string(), value.trim().to_string()))
}

use std::collections::HashMap;

use bytes::BytesMut;

/// HTTP status codes the server produces.
///
/// - `Ok` (200): Request successful
/// - `PartialContent` (206): A byte range of the resource
/// - `MovedPermanently` (301): Redirect, see `Location`
/// - `BadRequest` (400): Malformed request
/// - `Forbidden` (403): Access refused
/// - `NotFound` (404): Resource not found
/// - `MethodNotAllowed` (405): Path matched, method did not
/// - `RangeNotSatisfiable` (416): Range outside the resource
/// - `InternalServerError` (500): Handler fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 206 Partial Content
    PartialContent,
    /// 301 Moved Permanently
    MovedPermanently,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 416 Range Not Satisfiable
    RangeNotSatisfiable,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use plainhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::RangeNotSatisfiable.as_u16(), 416);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::PartialContent => 206,
            StatusCode::MovedPermanently => 301,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::RangeNotSatisfiable => 416,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        let status = match code {
            200 => StatusCode::Ok,
            206 => StatusCode::PartialContent,
            301 => StatusCode::MovedPermanently,
            400 => StatusCode::BadRequest,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            416 => StatusCode::RangeNotSatisfiable,
            500 => StatusCode::InternalServerError,
            _ => return None,
        };
        Some(status)
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use plainhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::PartialContent.reason_phrase(), "Partial Content");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::PartialContent => "Partial Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RangeNotSatisfiable => "Range Not Satisfiable",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// An HTTP response under construction.
///
/// Handlers mutate it freely while the chain runs. The body is an in-memory
/// buffer that is written out as-is; `Content-Length` is always recomputed
/// from it by the writer, so a value set here is overwritten.
#[derive(Debug, Clone)]
pub struct Response {
    /// Protocol version of the status line
    pub version: String,
    /// The HTTP status code
    pub status: StatusCode,
    /// Reason phrase of the status line
    pub reason: String,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: BytesMut,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// An empty `HTTP/1.1 200 OK` with no headers and no body.
    pub fn new() -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status: StatusCode::Ok,
            reason: StatusCode::Ok.reason_phrase().to_string(),
            headers: HashMap::new(),
            body: BytesMut::new(),
        }
    }

    /// Sets the status line; the reason phrase follows from the status.
    pub fn set_status_line(&mut self, version: &str, status: StatusCode) {
        self.version = version.to_string();
        self.status = status;
        self.reason = status.reason_phrase().to_string();
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    /// Appends to the body.
    pub fn write(&mut self, data: impl AsRef<[u8]>) {
        self.body.extend_from_slice(data.as_ref());
    }

    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl AsRef<[u8]>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    /// Creates a 400 Bad Request response, as sent for unreadable requests.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .version("HTTP/1.0")
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(b"404 Not Found")
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .version("HTTP/1.0")
            .body(b"500 Internal Server Error")
            .build()
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use plainhttp::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}")
///     .build();
/// assert_eq!(&response.body[..], b"{}");
/// ```
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        let mut response = Response::new();
        response.set_status_line("HTTP/1.1", status);
        Self { response }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.response.version = version.into();
        self
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.response.set_header(key, value);
        self
    }

    /// Replaces the response body.
    pub fn body(mut self, body: impl AsRef<[u8]>) -> Self {
        self.response.body.clear();
        self.response.write(body);
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

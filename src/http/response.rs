//! Response model.
//!
//! # Responsibilities
//! - Hold status, raw header lines and the body written by handlers
//! - Provide content helpers (JSON, text, raw bytes, API errors)
//! - Mark the response as an event stream
//!
//! # Design Decisions
//! - Header lines keep insertion order and allow duplicates
//! - `body: None` suppresses `Content-Length` and the body entirely;
//!   `Some(vec![])` still sends `Content-Length: 0`

use serde::Serialize;

/// Ordered raw header lines (`Name: value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header line. Duplicates are kept.
    pub fn add(&mut self, name: &str, value: impl std::fmt::Display) {
        self.0.push(format!("{name}: {value}"));
    }

    /// Replace every line named `name` with a single new one.
    pub fn set(&mut self, name: &str, value: impl std::fmt::Display) {
        self.remove(name);
        self.add(name, value);
    }

    /// Drop every line named `name`, case-insensitively.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|line| {
            line.split_once(": ")
                .map_or(true, |(key, _)| !key.eq_ignore_ascii_case(name))
        });
    }

    /// Case-insensitive lookup of the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find_map(|line| {
            let (key, value) = line.split_once(": ")?;
            key.eq_ignore_ascii_case(name).then_some(value)
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    message: &'a str,
}

/// Response built by the handler chain and consumed once by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    event_stream: Option<String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: Some(Vec::new()),
            event_stream: None,
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Structured error: `{"message": ...}` as JSON.
    pub fn api_error(&mut self, status: u16, message: &str) {
        self.status = status;
        self.headers.set("content-type", "application/json");
        let body = serde_json::to_vec(&ApiErrorBody { message })
            .unwrap_or_else(|_| br#"{"message":"internal error"}"#.to_vec());
        self.body = Some(body);
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: u16, value: &T) {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.status = status;
                self.headers.set("content-type", "application/json");
                self.body = Some(body);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                self.api_error(500, "Failed to marshal response body.");
            }
        }
    }

    pub fn text(&mut self, status: u16, body: &str) {
        self.status = status;
        self.headers.set("content-type", "text/plain");
        self.body = Some(body.as_bytes().to_vec());
    }

    pub fn raw(&mut self, status: u16, body: Vec<u8>) {
        self.status = status;
        self.headers.set("content-type", "application/octet-stream");
        self.body = Some(body);
    }

    /// Turn this response into an event stream registered under `identifier`.
    ///
    /// Once the chain finishes, the connection is held open and every message
    /// pushed to `identifier` is written as an SSE `data:` frame.
    pub fn stream_events(&mut self, identifier: impl Into<String>) {
        self.event_stream = Some(identifier.into());
    }

    /// Identifier of the event stream this response was switched to, if any.
    pub fn event_stream(&self) -> Option<&str> {
        self.event_stream.as_deref()
    }

    pub(crate) fn take_event_stream(&mut self) -> Option<String> {
        self.event_stream.take()
    }
}

/// Reason phrase for a status line.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Moved Temporarily",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        419 => "Insufficient Space on Resource",
        420 => "Method Failure",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        511 => "Network Authentication Required",
        _ => "Unknown Status",
    }
}

//! Wire parser: raw bytes to [`Request`].
//!
//! # Responsibilities
//! - Read the request line and split method / target / version
//! - Split the target into path and query string
//! - Read header lines until the blank line
//! - Materialize the body on demand, honoring `content-length` and size limits
//!
//! # Design Decisions
//! - The head and the body are parsed in two separate steps; the body is read
//!   only when a route is about to run
//! - CRLF and bare LF line endings are both accepted
//! - Head lines and the header count are bounded by [`HeadLimits`]
//! - No chunked transfer-encoding: without `content-length` there is no body

use std::collections::HashMap;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::request::{QueryParams, Request};

/// Largest body length that is ever allocated, whatever the configured limit.
pub const BODY_CEILING: i64 = i32::MAX as i64;

/// Bounds on the request head, independent of the body limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadLimits {
    /// Longest request line or header line, terminator included.
    pub max_line_bytes: usize,
    pub max_headers: usize,
}

impl Default for HeadLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_headers: 100,
        }
    }
}

/// Failure while reading the request line or headers.
///
/// Always fatal to the connection; no response is attempted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("connection closed before the request line")]
    ConnectionClosed,

    #[error("invalid request line {0:?}")]
    InvalidRequestLine(String),

    #[error("connection closed while reading headers")]
    UnexpectedEof,

    #[error("head line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("more than {0} header lines")]
    TooManyHeaders(usize),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while materializing the body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("invalid content-length {0:?}")]
    InvalidContentLength(String),

    #[error("content length {length} exceeds maximum allowed size {max}")]
    TooLarge { length: i64, max: u64 },

    #[error("content length {0} too large")]
    AboveCeiling(i64),

    #[error("body read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl BodyError {
    /// Status for a structured client error, or `None` when the connection
    /// should simply be dropped.
    pub fn status(&self) -> Option<u16> {
        match self {
            BodyError::InvalidContentLength(_) => Some(400),
            BodyError::TooLarge { .. } | BodyError::AboveCeiling(_) => Some(413),
            BodyError::Io(_) => None,
        }
    }
}

/// Read one line of at most `max` bytes, stripping the line terminator.
/// `Ok(None)` on end of stream.
async fn read_line<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let n = (&mut *reader).take(max as u64).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if n == max && !buf.ends_with(b"\n") {
        return Err(ParseError::LineTooLong(max));
    }
    Ok(Some(String::from_utf8_lossy(buf).trim().to_string()))
}

/// Parse the request line and headers.
pub async fn parse_head<R>(reader: &mut R, limits: HeadLimits) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);

    let line = read_line(reader, &mut buf, limits.max_line_bytes)
        .await?
        .ok_or(ParseError::ConnectionClosed)?;

    let mut parts = line.split(' ');
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) if !method.is_empty() && !target.is_empty() => {
            (method, target)
        }
        _ => return Err(ParseError::InvalidRequestLine(line.clone())),
    };

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    let mut request = Request::new(method, path);
    request.query = QueryParams::parse(query);
    request.headers = read_headers(reader, &mut buf, limits).await?;

    Ok(request)
}

async fn read_headers<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limits: HeadLimits,
) -> Result<HashMap<String, String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HashMap::new();
    let mut lines = 0;
    loop {
        let line = read_line(reader, buf, limits.max_line_bytes)
            .await?
            .ok_or(ParseError::UnexpectedEof)?;
        if line.is_empty() {
            return Ok(headers);
        }

        lines += 1;
        if lines > limits.max_headers {
            return Err(ParseError::TooManyHeaders(limits.max_headers));
        }

        // Lines without the separator are skipped.
        if let Some((name, value)) = line.split_once(": ") {
            headers.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }
}

/// Read the body announced by `content-length`.
///
/// `max` is the configured (or default) body limit. A short read at end of
/// stream truncates the body instead of failing.
pub async fn read_body<R>(
    reader: &mut R,
    headers: &HashMap<String, String>,
    max: u64,
) -> Result<Vec<u8>, BodyError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(raw) = headers.get("content-length") else {
        return Ok(Vec::new());
    };

    let length: i64 = raw
        .trim()
        .parse()
        .map_err(|_| BodyError::InvalidContentLength(raw.clone()))?;

    if length > 0 && length as u64 > max {
        return Err(BodyError::TooLarge { length, max });
    }
    if length > BODY_CEILING {
        return Err(BodyError::AboveCeiling(length));
    }
    if length <= 0 {
        return Ok(Vec::new());
    }

    let mut body = Vec::with_capacity(length as usize);
    reader.take(length as u64).read_to_end(&mut body).await?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn head(raw: &str) -> Result<Request, ParseError> {
        let mut reader = BufReader::new(raw.as_bytes());
        parse_head(&mut reader, HeadLimits::default()).await
    }

    fn content_length(value: &str) -> HashMap<String, String> {
        HashMap::from([("content-length".to_string(), value.to_string())])
    }

    #[tokio::test]
    async fn parses_request_line_query_and_headers() {
        let req = head("GET /a/1/b?x=1&x=2&y HTTP/1.1\r\nHost: example.com\r\nX-Custom: A: B\r\n\r\n")
            .await
            .unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/a/1/b");
        assert_eq!(req.query.get_all("x"), ["1".to_string(), "2".to_string()]);
        assert_eq!(req.query.get("y"), Some(""));
        assert_eq!(req.header("host"), Some("example.com"));
        assert_eq!(req.header("x-custom"), Some("A: B"));
        assert!(req.body.is_none());
        assert!(req.params.is_empty());
    }

    #[tokio::test]
    async fn accepts_bare_line_feeds_and_skips_malformed_headers() {
        let req = head("POST /upload HTTP/1.1\nContent-Length: 3\nnot a header\nAccept:tight\n\n")
            .await
            .unwrap();

        assert_eq!(req.method, "POST");
        assert_eq!(req.header("content-length"), Some("3"));
        assert_eq!(req.headers.len(), 1);
    }

    #[tokio::test]
    async fn version_token_is_optional() {
        let req = head("DELETE /items/7\r\n\r\n").await.unwrap();
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.path, "/items/7");
    }

    #[tokio::test]
    async fn request_line_failures_are_fatal() {
        assert!(matches!(head("").await, Err(ParseError::ConnectionClosed)));
        assert!(matches!(
            head("GARBAGE\r\n\r\n").await,
            Err(ParseError::InvalidRequestLine(_))
        ));
        assert!(matches!(
            head("GET /a HTTP/1.1\r\nHost: x\r\n").await,
            Err(ParseError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn overlong_lines_are_fatal() {
        let limits = HeadLimits {
            max_line_bytes: 32,
            max_headers: 4,
        };

        let long_target = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));
        let mut reader = BufReader::new(long_target.as_bytes());
        assert!(matches!(
            parse_head(&mut reader, limits).await,
            Err(ParseError::LineTooLong(32))
        ));

        let long_header = format!("GET / HTTP/1.1\r\nX-Big: {}\r\n\r\n", "b".repeat(64));
        let mut reader = BufReader::new(long_header.as_bytes());
        assert!(matches!(
            parse_head(&mut reader, limits).await,
            Err(ParseError::LineTooLong(32))
        ));

        let exact = "GET /exactly-thirty-two-bytes1\r\n\r\n";
        assert_eq!(exact.find('\n'), Some(31));
        let mut reader = BufReader::new(exact.as_bytes());
        assert!(parse_head(&mut reader, limits).await.is_ok());
    }

    #[tokio::test]
    async fn header_count_is_bounded() {
        let limits = HeadLimits {
            max_line_bytes: 1024,
            max_headers: 2,
        };
        let mut reader = BufReader::new(&b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\n\r\n"[..]);
        assert_eq!(parse_head(&mut reader, limits).await.unwrap().headers.len(), 2);

        let mut reader =
            BufReader::new(&b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n"[..]);
        assert!(matches!(
            parse_head(&mut reader, limits).await,
            Err(ParseError::TooManyHeaders(2))
        ));
    }

    #[tokio::test]
    async fn body_reads_exact_length_and_leaves_the_rest() {
        let mut reader = BufReader::new(&b"hello world"[..]);
        let body = read_body(&mut reader, &content_length("5"), 1024)
            .await
            .unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn body_truncates_on_short_read() {
        let mut reader = BufReader::new(&b"abc"[..]);
        let body = read_body(&mut reader, &content_length("10"), 1024)
            .await
            .unwrap();
        assert_eq!(body, b"abc");
    }

    #[tokio::test]
    async fn body_absent_without_content_length() {
        let mut reader = BufReader::new(&b"ignored"[..]);
        let body = read_body(&mut reader, &HashMap::new(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn non_positive_length_yields_empty_body() {
        for value in ["0", "-5"] {
            let mut reader = BufReader::new(&b"data"[..]);
            let body = read_body(&mut reader, &content_length(value), 1024)
                .await
                .unwrap();
            assert!(body.is_empty(), "length {value}");
        }
    }

    #[tokio::test]
    async fn invalid_content_length_is_a_client_error() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_body(&mut reader, &content_length("ten"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::InvalidContentLength(_)));
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn oversized_body_fails_before_reading() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_body(&mut reader, &content_length("50000000"), 10_485_760)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BodyError::TooLarge {
                length: 50_000_000,
                max: 10_485_760
            }
        ));
        assert_eq!(err.status(), Some(413));
    }

    #[tokio::test]
    async fn ceiling_applies_even_with_a_huge_limit() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_body(&mut reader, &content_length("3000000000"), u64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::AboveCeiling(3_000_000_000)));
    }
}

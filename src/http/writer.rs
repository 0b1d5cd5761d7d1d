//! Response writer: [`Response`] to wire bytes.
//!
//! # Responsibilities
//! - Serialize status line, header lines and body for a normal response
//! - Serialize the event-stream head and frame pushed messages as SSE
//!
//! # Design Decisions
//! - Writes use CRLF; SSE frames use `\n\n` as the event terminator
//! - `Content-Length` is emitted by the writer, never by handlers
//! - The caller closes the connection after a normal response

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::event_stream::EventStream;
use crate::http::response::{reason_phrase, Response};

pub const PROTOCOL: &str = "HTTP/1.1";

fn encode_head(res: &Response, out: &mut Vec<u8>) {
    out.extend_from_slice(
        format!("{PROTOCOL} {} {}\r\n", res.status, reason_phrase(res.status)).as_bytes(),
    );
    for line in res.headers.lines() {
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
}

/// Encode a complete normal response.
pub fn encode_response(res: &Response) -> Vec<u8> {
    let body_len = res.body.as_ref().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(128 + body_len);
    encode_head(res, &mut out);

    match &res.body {
        Some(body) => {
            out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
            out.extend_from_slice(body);
        }
        None => out.extend_from_slice(b"\r\n"),
    }
    out
}

/// Encode one SSE frame.
pub fn encode_event(message: &str) -> Vec<u8> {
    format!("data: {message}\n\n").into_bytes()
}

pub async fn write_response<W>(writer: &mut W, res: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_response(res)).await?;
    writer.flush().await
}

/// Write the head of an event-stream response.
pub async fn write_stream_head<W>(writer: &mut W, res: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = Vec::with_capacity(128);
    encode_head(res, &mut out);
    out.extend_from_slice(b"Content-Type: text/event-stream\r\n\r\n");
    writer.write_all(&out).await?;
    writer.flush().await
}

/// Forward every message of `stream` to `writer` until the stream closes.
///
/// Returns the number of frames written. A write failure ends the loop with
/// the error.
pub async fn pump_events<W>(writer: &mut W, stream: &mut EventStream) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut frames = 0;
    while let Some(message) = stream.recv().await {
        writer.write_all(&encode_event(&message)).await?;
        writer.flush().await?;
        frames += 1;
    }
    Ok(frames)
}

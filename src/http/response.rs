//! HTTP/1.1 response builder.
//!
//! A response body is either a fixed byte buffer, sent with `Content-Length`,
//! or a stream read from an [`AsyncRead`] until EOF and sent with
//! `Transfer-Encoding: chunked`. The server writes and flushes each chunk as
//! soon as it is read, which is what lets relay events reach the browser one
//! line at a time.

use std::fmt;

use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

use super::{Headers, StatusCode};

/// Source of a streamed response body.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// The payload of a [`Response`].
pub enum Body {
    /// A complete body, framed with `Content-Length`.
    Full(Vec<u8>),
    /// A body produced incrementally, framed with chunked transfer-encoding.
    Stream(BodyReader),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use newsdesk::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let (head, body) = response.into_parts();
/// let text = std::str::from_utf8(&head).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// assert!(body.is_none());
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Full(Vec::new()),
            keep_alive: true,
        }
    }

    /// Shorthand for a plain-text response, as used for error replies.
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status).body(message)
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Full(body.into().into_bytes());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Full(body.into());
        self
    }

    /// Streams the body from `reader` until it reaches EOF.
    #[must_use]
    pub fn stream(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.body = Body::Stream(Box::new(reader));
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers set so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns `true` if the body is streamed.
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::Stream(_))
    }

    /// Serializes the status line and headers, and for a fixed body the body
    /// itself, into one buffer. A streamed body is handed back for the caller
    /// to frame as chunks.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if no `Content-Type` was set
    ///   and the body is non-empty or streamed.
    /// - `Content-Length: <n>` for fixed bodies, `Transfer-Encoding: chunked`
    ///   for streamed ones.
    /// - `Connection: keep-alive` or `Connection: close`.
    pub fn into_parts(mut self) -> (BytesMut, Option<BodyReader>) {
        let has_body = match &self.body {
            Body::Full(bytes) => !bytes.is_empty(),
            Body::Stream(_) => true,
        };
        if has_body && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        self.headers.set("Connection", connection);

        let (framing, full, reader) = match self.body {
            Body::Full(bytes) => (format!("Content-Length: {}", bytes.len()), bytes, None),
            Body::Stream(reader) => ("Transfer-Encoding: chunked".to_owned(), Vec::new(), Some(reader)),
        };

        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64 + full.len());

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        // Framing is always the last header before the blank line
        buf.put(framing.as_bytes());
        buf.put(&b"\r\n\r\n"[..]);
        buf.put(full.as_slice());

        (buf, reader)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

/// Frames `data` as a single HTTP/1.1 chunk.
pub fn encode_chunk(data: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(data.len() + 12);
    buf.put(format!("{:x}\r\n", data.len()).as_bytes());
    buf.put(data);
    buf.put(&b"\r\n"[..]);
    buf
}

/// The zero-length chunk that terminates a chunked body.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length header: {value:?}")]
    InvalidContentLength { value: String },

    #[error("declared body of {length} bytes exceeds the request size limit")]
    TooLarge { length: usize },
}

/// Largest request, head plus body, the server will buffer (8 MiB).
pub const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// A fully parsed HTTP/1.1 request, body included.
///
/// # Examples
///
/// ```
/// use newsdesk::http::request::Request;
///
/// let raw = b"POST /api/run-pplx-queries HTTP/1.1\r\nContent-Length: 15\r\n\r\n{\"queries\":[]}\n";
/// let (request, consumed) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "POST");
/// assert_eq!(request.path(), "/api/run-pplx-queries");
/// assert_eq!(request.body().len(), 15);
/// assert_eq!(consumed, raw.len());
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parse one request (head and `Content-Length` body) from the front of `buf`.
    ///
    /// Returns the request and the number of bytes it occupied, so the caller
    /// can drop exactly that prefix and keep any pipelined bytes that follow.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: the head or the body has not fully arrived.
    /// - [`RequestError::Parse`]: the head is malformed.
    /// - [`RequestError::MissingField`]: method, path or version is absent.
    /// - [`RequestError::InvalidContentLength`]: the body length is not a number.
    /// - [`RequestError::TooLarge`]: the declared body would take the request
    ///   past [`MAX_REQUEST_SIZE`].
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = match raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse::<Method>()
        {
            Ok(method) => method,
            Err(never) => match never {},
        };

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;
        // The query string carries nothing any route reads.
        let path = raw_path.split('?').next().unwrap_or(raw_path).to_owned();

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let content_length = match header_map.get("content-length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength {
                    value: value.to_owned(),
                })?,
            None => 0,
        };

        let total = match body_offset.checked_add(content_length) {
            Some(total) if total <= MAX_REQUEST_SIZE => total,
            _ => {
                return Err(RequestError::TooLarge {
                    length: content_length,
                });
            }
        };
        if buf.len() < total {
            return Err(RequestError::Incomplete);
        }
        let body = Bytes::copy_from_slice(&buf[body_offset..total]);

        Ok((
            Self {
                method,
                path,
                version,
                headers: header_map,
                body,
            },
            total,
        ))
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }
}

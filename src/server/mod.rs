//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler function.
//! Connections are persistent (keep-alive) and responses may be streamed: a
//! streamed body is forwarded chunk by chunk, with a flush after every chunk.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    StatusCode,
    request::{MAX_REQUEST_SIZE, Request, RequestError},
    response::{LAST_CHUNK, Response, encode_chunk},
};
use crate::router::Router;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Largest slice of a streamed body sent as one chunk.
const STREAM_CHUNK_SIZE: usize = 16 * 1024;

/// The relay's HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use newsdesk::server::Server;
/// use newsdesk::http::{Request, Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(|_req: Request| async {
///         Response::new(StatusCode::Ok).body("Hello!")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// Every connection gets its own Tokio task; the handler is shared
    /// between them behind an [`Arc`]. Runs until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "newsdesk listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }

    /// Like [`Server::run`], dispatching every request through `router`.
    pub async fn serve(self, router: Router) -> Result<(), ServerError> {
        let router = Arc::new(router);
        self.run(move |request| {
            let router = Arc::clone(&router);
            async move { router.route(request).await }
        })
        .await
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// Loops reading one request per iteration until the peer closes the
/// connection or signals `Connection: close`.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        // Pipelined bytes left over from the previous request may already
        // hold a complete request.
        let parsed = if buf.is_empty() {
            Err(RequestError::Incomplete)
        } else {
            Request::parse(&buf)
        };

        let (request, consumed) = match parsed {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) if buf.len() > MAX_REQUEST_SIZE => {
                warn!(peer = %peer_addr, buffered = buf.len(), "request too large, sending 413");
                reject_too_large(&mut stream).await?;
                break;
            }
            Err(RequestError::TooLarge { length }) => {
                warn!(peer = %peer_addr, length, "declared body too large, sending 413");
                reject_too_large(&mut stream).await?;
                break;
            }
            Err(RequestError::Incomplete) => {
                buf.reserve(INITIAL_BUF_SIZE);
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::text(StatusCode::BadRequest, format!("Bad Request: {e}"))
                    .keep_alive(false);
                write_response(&mut stream, response).await?;
                break;
            }
        };

        let _ = buf.split_to(consumed);
        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = handler(request).await.keep_alive(keep_alive);
        write_response(&mut stream, response).await?;

        if !keep_alive {
            debug!(peer = %peer_addr, "connection: close, shutting down");
            break;
        }
    }

    Ok(())
}

async fn reject_too_large<W>(out: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response =
        Response::text(StatusCode::PayloadTooLarge, "Request entity too large").keep_alive(false);
    write_response(out, response).await
}

/// Writes `response` to `out`, forwarding a streamed body chunk by chunk.
///
/// Every chunk is flushed before the next read so nothing sits in a buffer
/// while the producer waits on an upstream provider.
pub(crate) async fn write_response<W>(out: &mut W, response: Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (head, body) = response.into_parts();
    out.write_all(&head).await?;
    out.flush().await?;

    if let Some(mut reader) = body {
        forward_chunks(&mut reader, out).await?;
    }
    Ok(())
}

async fn forward_chunks<R, W>(reader: &mut R, out: &mut W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        out.write_all(&encode_chunk(&chunk[..n])).await?;
        out.flush().await?;
    }
    out.write_all(LAST_CHUNK).await?;
    out.flush().await
}

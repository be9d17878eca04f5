//! Request routing: map exact paths and HTTP methods to handler functions.
//!
//! Dispatch rules, checked in order:
//!
//! 1. The first route whose method and path both match handles the request.
//! 2. A path that is registered, but not for this method, gets
//!    `405 Method Not Allowed` with an `Allow` header listing the bound methods.
//! 3. Anything else goes to the fallback handler (static files in the app),
//!    or gets `404 Not Found` when no fallback is set.
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so
//! `/api/settings/` and `/api/settings` are treated as equivalent.

use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::info;

use crate::context::Context;
use crate::{Method, Request, Response, StatusCode};

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait through the blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

fn normalize(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

// A single registered route binding a method + exact path to a handler.
struct Route {
    method: Method,
    path: String,
    handler: Handler,
}

/// HTTP request router.
///
/// # Examples
///
/// ```rust,no_run
/// use newsdesk::{Context, Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/api/settings", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// router.post("/api/settings", |_ctx: Context| async { Response::new(StatusCode::Ok) });
/// router.fallback(|_ctx: Context| async { Response::new(StatusCode::NotFound) });
/// ```
pub struct Router {
    routes: Vec<Route>,
    fallback: Option<Handler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new, empty `Router` with no registered routes.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
        }
    }

    /// Register a handler for `GET` requests to `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    /// Register a handler for `POST` requests to `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, handler);
    }

    /// Set the handler for requests whose path has no registered route.
    pub fn fallback(&mut self, handler: impl IntoHandler) {
        self.fallback = Some(erase(handler));
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        self.routes.push(Route {
            method,
            path: normalize(path).to_owned(),
            handler: erase(handler),
        });
    }

    /// Dispatch `request` and return the response, logging one line per request.
    pub async fn route(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_owned();

        let response = self.dispatch(request).await;

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed = ?start.elapsed(),
            "request handled"
        );
        response
    }

    async fn dispatch(&self, request: Request) -> Response {
        let path = normalize(request.path());

        let mut allowed: Vec<&str> = Vec::new();
        let mut handler = None;
        for route in self.routes.iter().filter(|r| r.path == path) {
            if &route.method == request.method() {
                handler = Some(Arc::clone(&route.handler));
                break;
            }
            allowed.push(route.method.as_str());
        }

        if let Some(handler) = handler {
            return handler(Context::new(request)).await;
        }
        if !allowed.is_empty() {
            return Response::text(StatusCode::MethodNotAllowed, "method not allowed")
                .header("Allow", allowed.join(", "));
        }
        match &self.fallback {
            Some(fallback) => fallback(Context::new(request)).await,
            None => Response::new(StatusCode::NotFound),
        }
    }
}

// Erase the concrete handler type and store it as a `Handler` trait object.
fn erase(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx| handler.call(ctx))
}

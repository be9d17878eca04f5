//! Per-request context handed to route handlers.

use serde::de::DeserializeOwned;

use crate::Request;

/// Per-request context: the parsed request plus body decoding helpers.
pub struct Context {
    request: Request,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Decode the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }

    /// The request body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.request.body()).into_owned()
    }
}

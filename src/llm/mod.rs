//! Provider adapters, one per upstream text-generation API.
//!
//! Every adapter turns one input string into a [`FragmentStream`]: a lazy
//! sequence of text [`Fragment`]s. Failures that happen before the first
//! fragment (missing key, non-200 status, connection refused) are returned
//! from [`Provider::stream`] itself; a failure while reading the body
//! arrives as an `Err` item and ends the stream.
//!
//! | Adapter                         | Upstream                 | Shape                     |
//! |---------------------------------|--------------------------|---------------------------|
//! | [`openai::ChatCompletions`]     | OpenAI chat completions  | `data:` lines, typed JSON |
//! | [`grok::SearchChat`]            | xAI chat + live search   | `data:` lines, untyped    |
//! | [`perplexity::SearchAnswer`]    | Perplexity sonar         | one JSON body             |

use std::pin::Pin;

use futures::Stream;
use futures::future::BoxFuture;
use reqwest::header::ACCEPT;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod grok;
pub mod openai;
pub mod perplexity;
pub mod sse;

pub use grok::SearchChat;
pub use openai::ChatCompletions;
pub use perplexity::SearchAnswer;

/// One incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Lazily produced fragments for one input item.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, LlmError>> + Send>>;

/// Errors raised by provider adapters.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The API key variable is unset or empty.
    #[error("{var} not set")]
    MissingApiKey { var: String },

    /// The provider answered with a non-200 status.
    #[error("{provider} API error {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The request could not be sent, or the body could not be read.
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// A text-generation backend the relay can drive.
///
/// Returns a boxed future, like the router's handlers, so adapters can sit
/// behind `Arc<dyn Provider>` and be swapped for fakes in tests.
pub trait Provider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Start generating for `input`.
    fn stream<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<FragmentStream, LlmError>>;
}

/// Where an adapter sends requests and how it authenticates.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Full URL of the completions endpoint.
    pub endpoint: String,
    /// Model identifier sent in every request.
    pub model: String,
    /// Environment variable holding the bearer token, read on every call.
    pub api_key_env: String,
    /// A fixed key; takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
            api_key: None,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Resolve the bearer token at call time.
    pub fn resolve_api_key(&self) -> Result<String, LlmError> {
        let key = match &self.api_key {
            Some(key) => key.clone(),
            None => std::env::var(&self.api_key_env).unwrap_or_default(),
        };
        if key.is_empty() {
            return Err(LlmError::MissingApiKey {
                var: self.api_key_env.clone(),
            });
        }
        Ok(key)
    }
}

/// POST `payload` as JSON and return the response once its status is 200.
///
/// Any other status is read to the end and returned as [`LlmError::Upstream`].
pub(crate) async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &'static str,
    config: &ProviderConfig,
    accept: &'static str,
    payload: &T,
) -> Result<reqwest::Response, LlmError> {
    let api_key = config.resolve_api_key()?;
    debug!(provider, endpoint = %config.endpoint, model = %config.model, "calling provider");

    let response = client
        .post(&config.endpoint)
        .bearer_auth(api_key)
        .header(ACCEPT, accept)
        .json(payload)
        .send()
        .await
        .map_err(|source| LlmError::Transport { provider, source })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_owned());
        return Err(LlmError::Upstream {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Chat message as every provider here accepts it.
#[derive(Debug, Serialize)]
pub(crate) struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

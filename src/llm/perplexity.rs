//! Single-shot search adapter (Perplexity sonar, non-streaming).
//!
//! The whole body is read, then decoded as a completion envelope. When that
//! fails, or the envelope has no choices, the raw body text is used as the
//! answer instead: a schema mismatch degrades the output, it never fails it.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{Fragment, FragmentStream, LlmError, Message, Provider, ProviderConfig, post_json};

const PROVIDER: &str = "Perplexity";

pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar-pro";
pub const API_KEY_ENV: &str = "PPLX_API_KEY";
pub const DEFAULT_SEARCH_MODE: &str = "sec";

/// Answers one query in a single response.
pub struct SearchAnswer {
    client: reqwest::Client,
    config: ProviderConfig,
    search_mode: String,
}

impl SearchAnswer {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self {
            client,
            config,
            search_mode: DEFAULT_SEARCH_MODE.to_owned(),
        }
    }

    #[must_use]
    pub fn with_search_mode(mut self, mode: impl Into<String>) -> Self {
        self.search_mode = mode.into();
        self
    }

    /// The default Perplexity endpoint, model and key variable.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, API_KEY_ENV)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    search_mode: &'a str,
}

pub(crate) fn build_request<'a>(model: &'a str, query: &'a str, search_mode: &'a str) -> AnswerRequest<'a> {
    AnswerRequest {
        model,
        messages: [Message {
            role: "user",
            content: query,
        }],
        search_mode,
    }
}

// Every level may be absent or null; either reads as empty.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<AnswerMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct AnswerMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The first choice's message content, or `raw` itself when it does not
/// decode as an envelope with at least one choice.
pub fn resolve_content(raw: &str) -> String {
    match serde_json::from_str::<Envelope>(raw) {
        Ok(envelope) => match envelope.choices.unwrap_or_default().into_iter().next() {
            Some(choice) => choice.message.unwrap_or_default().content.unwrap_or_default(),
            None => raw.to_owned(),
        },
        Err(e) => {
            tracing::debug!(provider = PROVIDER, error = %e, "body is not an envelope, relaying raw text");
            raw.to_owned()
        }
    }
}

impl Provider for SearchAnswer {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn stream<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<FragmentStream, LlmError>> {
        Box::pin(async move {
            let payload = build_request(&self.config.model, input, &self.search_mode);
            let response =
                post_json(&self.client, PROVIDER, &self.config, "application/json", &payload).await?;
            let raw = response
                .text()
                .await
                .map_err(|source| LlmError::Transport {
                    provider: PROVIDER,
                    source,
                })?;

            let fragment = Fragment::new(resolve_content(&raw));
            let stream: FragmentStream = Box::pin(futures::stream::once(async move { Ok(fragment) }));
            Ok(stream)
        })
    }
}

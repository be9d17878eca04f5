//! Chat-completion adapter (OpenAI, streaming).

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::sse::{data_fragments, response_bytes};
use super::{FragmentStream, LlmError, Message, Provider, ProviderConfig, post_json};

const PROVIDER: &str = "OpenAI";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
const SYSTEM_PROMPT: &str = "You are a concise news-summary assistant.";

/// Streams a chat completion for one prompt.
pub struct ChatCompletions {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl ChatCompletions {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// The default OpenAI endpoint, model and key variable.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, API_KEY_ENV)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

pub(crate) fn build_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: [
            Message {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            Message {
                role: "user",
                content: prompt,
            },
        ],
        stream: true,
    }
}

// One `data:` payload of the completion stream. Every field is optional so
// keep-alive and role-only chunks decode cleanly.
#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// The first choice's non-empty `delta.content`, if any.
pub(crate) fn extract_delta(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let chunk: StreamChunk = serde_json::from_str(payload)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

impl Provider for ChatCompletions {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn stream<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<FragmentStream, LlmError>> {
        Box::pin(async move {
            let payload = build_request(&self.config.model, input);
            let response =
                post_json(&self.client, PROVIDER, &self.config, "text/event-stream", &payload).await?;
            Ok(data_fragments(
                PROVIDER,
                response_bytes(PROVIDER, response),
                extract_delta,
            ))
        })
    }
}

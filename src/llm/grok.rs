//! Search-chat adapter (xAI Grok with live search, streaming).
//!
//! The event-stream schema here is provider-specific and not pinned down, so
//! payloads are decoded as an untyped [`Value`] and the text is looked up at
//! `choices[0].delta.content`. A missing or mistyped field at any level means
//! "no fragment for this line", never an error.

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use super::sse::{data_fragments, response_bytes};
use super::{FragmentStream, LlmError, Message, Provider, ProviderConfig, post_json};

const PROVIDER: &str = "Grok";

pub const DEFAULT_ENDPOINT: &str = "https://api.x.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "grok-3-latest";
pub const API_KEY_ENV: &str = "GROK_API_KEY";

/// Live-search options sent with every request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchParameters {
    pub mode: String,
    pub max_search_results: u32,
    pub return_citations: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            mode: "auto".to_owned(),
            max_search_results: 30,
            return_citations: true,
        }
    }
}

/// Streams a search-augmented chat answer for one prompt.
pub struct SearchChat {
    client: reqwest::Client,
    config: ProviderConfig,
    search: SearchParameters,
}

impl SearchChat {
    pub fn new(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self {
            client,
            config,
            search: SearchParameters::default(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: SearchParameters) -> Self {
        self.search = search;
        self
    }

    /// The default xAI endpoint, model and key variable.
    pub fn default_config() -> ProviderConfig {
        ProviderConfig::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, API_KEY_ENV)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    search_parameters: &'a SearchParameters,
    stream: bool,
}

pub(crate) fn build_request<'a>(
    model: &'a str,
    prompt: &'a str,
    search: &'a SearchParameters,
) -> SearchChatRequest<'a> {
    SearchChatRequest {
        model,
        messages: [Message {
            role: "user",
            content: prompt,
        }],
        search_parameters: search,
        stream: true,
    }
}

pub(crate) fn extract_delta(payload: &str) -> Result<Option<String>, serde_json::Error> {
    let event: Value = serde_json::from_str(payload)?;
    Ok(event
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.pointer("/delta/content"))
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_owned))
}

impl Provider for SearchChat {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn stream<'a>(&'a self, input: &'a str) -> BoxFuture<'a, Result<FragmentStream, LlmError>> {
        Box::pin(async move {
            let payload = build_request(&self.config.model, input, &self.search);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::sse::testing::{chunks, collect_texts};

    #[test]
    fn request_carries_search_parameters() {
        let search = SearchParameters::default();
        let body = serde_json::to_value(build_request("grok-3-latest", "headlines?", &search)).unwrap();
        assert_eq!(body["model"], "grok-3-latest");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "headlines?");
        assert_eq!(body["search_parameters"]["mode"], "auto");
        assert_eq!(body["search_parameters"]["max_search_results"], 30);
        assert_eq!(body["search_parameters"]["return_citations"], true);
    }

    #[test]
    fn content_is_found_defensively() {
        assert_eq!(
            extract_delta(r#"{"choices":[{"delta":{"content":"x"}}]}"#).unwrap().as_deref(),
            Some("x")
        );
        // Every kind of shape drift is just "nothing here".
        for payload in [
            r#"{}"#,
            r#"{"choices":"nope"}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":{"0":{"delta":{"content":"keyed"}}}}"#,
            r#"{"choices":[42]}"#,
            r#"{"choices":[{"delta":null}]}"#,
            r#"{"choices":[{"delta":{"content":7}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            r#"[1,2,3]"#,
        ] {
            assert_eq!(extract_delta(payload).unwrap(), None, "payload {payload}");
        }
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(extract_delta("{").is_err());
    }

    #[tokio::test]
    async fn malformed_line_then_good_line() {
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\"\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Citations follow\"}}]}\n",
            "data: [DONE]\n",
        ]);
        let texts = collect_texts(data_fragments(PROVIDER, body, extract_delta)).await;
        assert_eq!(texts, vec!["Citations follow"]);
    }
}

//! The newsdesk application: routes, shared state and request handlers.
//!
//! The three relay endpoints answer with a chunked NDJSON stream. Each
//! handler validates its body up front, so a malformed request still gets a
//! plain `400`. It then spawns a task that drives the relay into one end of
//! an in-memory pipe, and hands the other end to the server as the
//! response body.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tokio::io::DuplexStream;
use tracing::{error, warn};

use crate::context::Context;
use crate::llm::{ChatCompletions, Provider, SearchAnswer, SearchChat};
use crate::relay::{EventEncoder, Heading, relay_batch, relay_single};
use crate::settings::{SettingsError, SettingsStore};
use crate::{Response, Router, StatusCode};

pub mod assets;

const PIPE_CAPACITY: usize = 64 * 1024;

/// The three adapters behind the relay endpoints.
#[derive(Clone)]
pub struct Providers {
    /// `/api/generate-summaries`
    pub summaries: Arc<dyn Provider>,
    /// `/api/run-grok-prompts`
    pub prompts: Arc<dyn Provider>,
    /// `/api/run-pplx-queries`
    pub queries: Arc<dyn Provider>,
}

impl Providers {
    /// The production adapters, sharing one connection pool.
    pub fn standard(client: reqwest::Client) -> Self {
        Self {
            summaries: Arc::new(ChatCompletions::new(client.clone(), ChatCompletions::default_config())),
            prompts: Arc::new(SearchChat::new(client.clone(), SearchChat::default_config())),
            queries: Arc::new(SearchAnswer::new(client, SearchAnswer::default_config())),
        }
    }
}

/// Everything the handlers share.
pub struct AppState {
    pub settings: SettingsStore,
    pub providers: Providers,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(settings: SettingsStore, providers: Providers, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            providers,
            static_dir: static_dir.into(),
        }
    }
}

/// Build the router for `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new();

    let s = Arc::clone(&state);
    router.post("/api/generate-summaries", move |ctx: Context| generate_summaries(Arc::clone(&s), ctx));

    let s = Arc::clone(&state);
    router.post("/api/run-grok-prompts", move |ctx: Context| run_prompts(Arc::clone(&s), ctx));

    let s = Arc::clone(&state);
    router.post("/api/run-pplx-queries", move |ctx: Context| run_queries(Arc::clone(&s), ctx));

    let s = Arc::clone(&state);
    router.get("/api/settings", move |_ctx: Context| read_settings(Arc::clone(&s)));

    let s = Arc::clone(&state);
    router.post("/api/settings", move |ctx: Context| write_settings(Arc::clone(&s), ctx));

    router.fallback(move |ctx: Context| {
        let state = Arc::clone(&state);
        async move {
            let request = ctx.request();
            assets::serve(&state.static_dir, request.method(), request.path()).await
        }
    });

    router
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryRequest {
    email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PromptBatch {
    prompts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryBatch {
    queries: Vec<String>,
}

fn bad_body(e: serde_json::Error) -> Response {
    warn!(error = %e, "rejected request body");
    Response::text(StatusCode::BadRequest, "invalid request body")
}

async fn generate_summaries(state: Arc<AppState>, ctx: Context) -> Response {
    let body: SummaryRequest = match ctx.json() {
        Ok(body) => body,
        Err(e) => return bad_body(e),
    };
    let prompt = state.settings.snapshot().await.news_request(&body.email);
    let provider = Arc::clone(&state.providers.summaries);

    stream_events("generate-summaries", move |mut encoder| async move {
        relay_single(&mut encoder, provider.as_ref(), &prompt).await.map(drop)
    })
}

async fn run_prompts(state: Arc<AppState>, ctx: Context) -> Response {
    let body: PromptBatch = match ctx.json() {
        Ok(body) => body,
        Err(e) => return bad_body(e),
    };
    let provider = Arc::clone(&state.providers.prompts);

    stream_events("run-grok-prompts", move |mut encoder| async move {
        relay_batch(&mut encoder, provider.as_ref(), Heading::Prompt, &body.prompts)
            .await
            .map(drop)
    })
}

async fn run_queries(state: Arc<AppState>, ctx: Context) -> Response {
    let body: QueryBatch = match ctx.json() {
        Ok(body) => body,
        Err(e) => return bad_body(e),
    };
    let provider = Arc::clone(&state.providers.queries);

    stream_events("run-pplx-queries", move |mut encoder| async move {
        relay_batch(&mut encoder, provider.as_ref(), Heading::Query, &body.queries)
            .await
            .map(drop)
    })
}

// Spawn `relay` against the write half of a pipe and stream the read half.
fn stream_events<F, Fut>(route: &'static str, relay: F) -> Response
where
    F: FnOnce(EventEncoder<DuplexStream>) -> Fut,
    Fut: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
    let task = relay(EventEncoder::new(writer));
    tokio::spawn(async move {
        if let Err(e) = task.await {
            warn!(route, error = %e, "client went away, relay stopped");
        }
    });

    Response::new(StatusCode::Ok)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Cache-Control", "no-cache")
        .stream(reader)
}

async fn read_settings(state: Arc<AppState>) -> Response {
    match state.settings.snapshot().await.to_document() {
        Ok(document) => Response::new(StatusCode::Ok)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(document),
        Err(e) => {
            error!(error = %e, "failed to render settings");
            Response::text(StatusCode::InternalServerError, "failed to render settings")
        }
    }
}

async fn write_settings(state: Arc<AppState>, ctx: Context) -> Response {
    match state.settings.replace_from_document(&ctx.text()).await {
        Ok(_) => Response::text(StatusCode::Ok, "settings saved"),
        Err(SettingsError::Parse(e)) => {
            warn!(error = %e, "rejected settings document");
            Response::text(StatusCode::BadRequest, format!("invalid settings document: {e}"))
        }
        Err(e) => {
            error!(error = %e, "failed to save settings");
            Response::text(StatusCode::InternalServerError, "failed to save settings")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::{Script, ScriptedProvider};
    use crate::relay::{Event, GENERATING_NOTICE, decode_lines};
    use crate::settings::Settings;
    use crate::Request;
    use tokio::io::AsyncReadExt;

    fn request(method: &str, path: &str, body: &str) -> Request {
        let raw = format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    fn state(dir: &std::path::Path, provider: ScriptedProvider) -> Arc<AppState> {
        let provider: Arc<dyn Provider> = Arc::new(provider);
        let providers = Providers {
            summaries: Arc::clone(&provider),
            prompts: Arc::clone(&provider),
            queries: provider,
        };
        let settings = Settings {
            news_prompt: "SUMMARIZE".to_owned(),
            ..Settings::default()
        };
        let store = SettingsStore::with_settings(dir.join("settings.toml"), settings);
        Arc::new(AppState::new(store, providers, dir.join("static")))
    }

    async fn events(response: Response) -> Vec<Event> {
        let (_, reader) = response.into_parts();
        let mut body = String::new();
        reader.unwrap().read_to_string(&mut body).await.unwrap();
        decode_lines(&body).unwrap()
    }

    #[tokio::test]
    async fn summaries_prefix_the_news_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new([("SUMMARIZE\n\nan email", Script::Chunks(vec!["ok"]))]);
        let router = router(state(dir.path(), provider));

        let res = router
            .route(request("POST", "/api/generate-summaries", r#"{"email":"an email"}"#))
            .await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("cache-control"), Some("no-cache"));
        assert!(res.is_streaming());
        assert_eq!(
            events(res).await,
            vec![
                Event::Prompt { content: GENERATING_NOTICE.to_owned() },
                Event::chunk("ok"),
                Event::End,
            ]
        );
    }

    #[tokio::test]
    async fn query_batch_streams_each_item() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new([
            ("q1", Script::Chunks(vec!["Hello", " world"])),
            ("q2", Script::Status(500)),
        ]);
        let router = router(state(dir.path(), provider));

        let res = router
            .route(request("POST", "/api/run-pplx-queries", r#"{"queries":["q1","q2"]}"#))
            .await;
        let events = events(res).await;
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], Event::Query { content: "q1".to_owned() });
        assert_eq!(events[4], Event::Query { content: "q2".to_owned() });
        assert_eq!(events[6], Event::End);
    }

    #[tokio::test]
    async fn missing_field_is_an_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(state(dir.path(), ScriptedProvider::new([])));

        let res = router.route(request("POST", "/api/run-grok-prompts", "{}")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert!(events(res).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(state(dir.path(), ScriptedProvider::new([])));

        let res = router
            .route(request("POST", "/api/run-grok-prompts", "{\"prompts\": [1,"))
            .await;
        assert_eq!(res.status(), StatusCode::BadRequest);
        assert!(!res.is_streaming());
    }

    #[tokio::test]
    async fn settings_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(state(dir.path(), ScriptedProvider::new([])));

        let document = "news_prompt = \"new prompt\"\ngrok_prompts = [\"g\"]\n";
        let res = router.route(request("POST", "/api/settings", document)).await;
        assert_eq!(res.status(), StatusCode::Ok);

        let res = router.route(request("GET", "/api/settings", "")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let (head, _) = res.into_parts();
        let text = String::from_utf8_lossy(&head);
        let body = text.split("\r\n\r\n").nth(1).unwrap();
        let settings = Settings::parse(body).unwrap();
        assert_eq!(settings.news_prompt, "new prompt");
        assert_eq!(settings.grok_prompts, vec!["g"]);
        assert!(settings.pplx_queries.is_empty());
    }

    #[tokio::test]
    async fn invalid_settings_are_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path(), ScriptedProvider::new([]));
        let before = state.settings.snapshot().await;
        let router = router(Arc::clone(&state));

        let res = router
            .route(request("POST", "/api/settings", "news_prompt = "))
            .await;
        assert_eq!(res.status(), StatusCode::BadRequest);
        assert_eq!(*state.settings.snapshot().await, *before);
        assert!(!dir.path().join("settings.toml").exists());
    }

    #[tokio::test]
    async fn unknown_get_goes_to_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/index.html"), "<html></html>").unwrap();
        let router = router(state(dir.path(), ScriptedProvider::new([])));

        let res = router.route(request("GET", "/", "")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.headers().get("content-type"), Some("text/html; charset=utf-8"));

        let res = router.route(request("GET", "/../settings.toml", "")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn relay_route_rejects_get() {
        let dir = tempfile::tempdir().unwrap();
        let router = router(state(dir.path(), ScriptedProvider::new([])));

        let res = router.route(request("GET", "/api/run-pplx-queries", "")).await;
        assert_eq!(res.status(), StatusCode::MethodNotAllowed);
        assert_eq!(res.headers().get("allow"), Some("POST"));
    }
}

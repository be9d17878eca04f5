//! # newsdesk
//!
//! A small local web service that relays prompts to hosted text-generation
//! APIs and streams the answers back to a browser as newline-delimited JSON.
//!
//! ## Layout
//!
//! - [`server`], [`http`], [`router`], [`context`]: the async HTTP/1.1 server.
//! - [`llm`]: one adapter per upstream provider, each producing a fragment stream.
//! - [`relay`]: drives adapters and writes the `prompt|query → chunk* → error? → end`
//!   event sequence.
//! - [`settings`]: the prompt-template document and its on-disk store.
//! - [`app`]: the routes, shared state and static files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use newsdesk::app::{self, AppState, Providers};
//! use newsdesk::settings::SettingsStore;
//! use newsdesk::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsStore::load("settings.toml").await;
//!     let providers = Providers::standard(reqwest::Client::new());
//!     let state = Arc::new(AppState::new(settings, providers, "static"));
//!
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     server.serve(app::router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod http;
pub mod llm;
pub mod relay;
pub mod router;
pub mod server;
pub mod settings;

pub use context::Context;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};

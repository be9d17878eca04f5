use std::sync::Arc;
use std::time::Duration;

use newsdesk::app::{self, AppState, Providers};
use newsdesk::config::AppConfig;
use newsdesk::settings::SettingsStore;
use newsdesk::{Server, ServerError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const BROWSER_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsdesk=info")),
        )
        .init();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded environment file"),
        Err(e) => debug!(error = %e, "no environment file loaded"),
    }

    let config = AppConfig::from_env();
    let settings = SettingsStore::load(&config.settings_path).await;
    let providers = Providers::standard(reqwest::Client::new());
    let state = Arc::new(AppState::new(settings, providers, &config.static_dir));

    let server = Server::bind(&config.addr).await?;
    if let Some(browser) = config.browser.clone() {
        tokio::spawn(open_browser(browser, config.url()));
    }

    server.serve(app::router(state)).await
}

async fn open_browser(browser: String, url: String) {
    tokio::time::sleep(BROWSER_DELAY).await;
    match std::process::Command::new(&browser).arg(&url).spawn() {
        Ok(_) => info!(%browser, %url, "opened browser"),
        Err(e) => warn!(%browser, %url, error = %e, "failed to open browser"),
    }
}

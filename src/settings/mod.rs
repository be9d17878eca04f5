//! User-editable prompt templates and their on-disk store.
//!
//! The document is TOML:
//!
//! ```toml
//! news_prompt = "..."
//! grok_prompts = ["...", "..."]
//!
//! [[pplx_queries]]
//! type = "template"
//! prompt = "Give the main takeaways about the following: {{context}}"
//! placeholder = "context"
//! label = "Takeaways"
//! ```
//!
//! [`SettingsStore`] keeps the current value as an immutable
//! `Arc<Settings>` snapshot. Readers clone the `Arc`; a write parses,
//! persists, and only then swaps the snapshot, so nobody ever sees a
//! half-applied update and a rejected write changes nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

mod defaults;

/// Errors from reading, parsing or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How the browser offers a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Sent as written.
    Fixed,
    /// The user fills in `placeholder` inside `prompt`.
    Template,
    /// The user types the whole query.
    Custom,
}

/// One entry of the query checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub label: String,
}

/// The whole settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Instructions placed in front of the pasted email.
    #[serde(default)]
    pub news_prompt: String,
    /// Prompts for the search-chat batch.
    #[serde(default)]
    pub grok_prompts: Vec<String>,
    /// Query checklist for the single-shot search batch.
    #[serde(default)]
    pub pplx_queries: Vec<QuerySpec>,
}

impl Default for Settings {
    fn default() -> Self {
        defaults::settings()
    }
}

impl Settings {
    /// Parse a settings document.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the settings as a document [`Settings::parse`] accepts.
    pub fn to_document(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The prompt sent for a pasted email.
    pub fn news_request(&self, email: &str) -> String {
        format!("{}\n\n{}", self.news_prompt, email)
    }
}

/// The settings file plus its current in-memory snapshot.
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Arc<Settings>>,
}

impl SettingsStore {
    /// Load `path`, falling back to the built-in defaults when the file is
    /// missing or does not parse.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match Settings::parse(&text) {
                Ok(settings) => {
                    info!(path = %path.display(), "settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file unreadable, using defaults");
                    Settings::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), error = %e, "no settings file, using defaults");
                Settings::default()
            }
        };
        Self::with_settings(path, settings)
    }

    /// A store that starts from `settings` without touching the disk.
    pub fn with_settings(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// The current settings. The snapshot never changes after it is handed out.
    pub async fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&*self.current.read().await)
    }

    /// Validate `document`, persist it, then make it current.
    ///
    /// On [`SettingsError::Parse`] nothing is written and the snapshot is kept.
    pub async fn replace_from_document(&self, document: &str) -> Result<Arc<Settings>, SettingsError> {
        let settings = Settings::parse(document)?;
        self.replace(settings).await
    }

    /// Persist `settings`, then make it current.
    pub async fn replace(&self, settings: Settings) -> Result<Arc<Settings>, SettingsError> {
        let document = settings.to_document()?;
        let mut current = self.current.write().await;
        write_atomically(&self.path, &document).await?;

        let settings = Arc::new(settings);
        *current = Arc::clone(&settings);
        info!(path = %self.path.display(), "settings saved");
        Ok(settings)
    }
}

// Write to a sibling temp file and rename it over the target, so a crash
// mid-write never leaves a truncated settings file behind.
async fn write_atomically(path: &Path, contents: &str) -> Result<(), SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Settings {
        Settings {
            news_prompt: "Summarize each source.\n\n".to_owned(),
            grok_prompts: vec!["What are today's headlines".to_owned()],
            pplx_queries: vec![
                QuerySpec {
                    kind: QueryKind::Fixed,
                    prompt: "Prepare me for the open".to_owned(),
                    placeholder: None,
                    label: "Open prep".to_owned(),
                },
                QuerySpec {
                    kind: QueryKind::Template,
                    prompt: "Takeaways: {{context}}".to_owned(),
                    placeholder: Some("context".to_owned()),
                    label: "Takeaways".to_owned(),
                },
                QuerySpec {
                    kind: QueryKind::Custom,
                    prompt: String::new(),
                    placeholder: None,
                    label: "Custom query".to_owned(),
                },
            ],
        }
    }

    #[test]
    fn document_round_trip() {
        let settings = sample();
        let text = settings.to_document().unwrap();
        assert_eq!(Settings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn defaults_round_trip() {
        let settings = Settings::default();
        assert_eq!(settings.grok_prompts.len(), 2);
        assert_eq!(settings.pplx_queries.len(), 4);
        let text = settings.to_document().unwrap();
        assert_eq!(Settings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn parse_hand_written_document() {
        let text = r#"
news_prompt = "Summaries please"
grok_prompts = ["one", "two"]

[[pplx_queries]]
type = "custom"
label = "Custom query"
"#;
        let settings = Settings::parse(text).unwrap();
        assert_eq!(settings.grok_prompts, vec!["one", "two"]);
        assert_eq!(settings.pplx_queries[0].kind, QueryKind::Custom);
        assert!(settings.pplx_queries[0].prompt.is_empty());
    }

    #[test]
    fn unknown_query_type_is_rejected() {
        let text = "[[pplx_queries]]\ntype = \"dynamic\"\nlabel = \"x\"\n";
        assert!(matches!(Settings::parse(text), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn news_request_joins_prompt_and_email() {
        let settings = Settings {
            news_prompt: "PROMPT".to_owned(),
            ..sample()
        };
        assert_eq!(settings.news_request("EMAIL"), "PROMPT\n\nEMAIL");
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.toml")).await;
        assert_eq!(*store.snapshot().await, Settings::default());
    }

    #[tokio::test]
    async fn unparseable_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "news_prompt = [").unwrap();
        let store = SettingsStore::load(&path).await;
        assert_eq!(*store.snapshot().await, Settings::default());
    }

    #[tokio::test]
    async fn replace_persists_and_swaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = SettingsStore::with_settings(&path, Settings::default());

        let before = store.snapshot().await;
        store.replace(sample()).await.unwrap();

        assert_eq!(*before, Settings::default());
        assert_eq!(*store.snapshot().await, sample());

        let reloaded = SettingsStore::load(&path).await;
        assert_eq!(*reloaded.snapshot().await, sample());
        assert!(!dir.path().join("settings.toml.tmp").exists());
    }

    #[tokio::test]
    async fn rejected_document_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let store = SettingsStore::with_settings(&path, sample());

        let err = store.replace_from_document("grok_prompts = \"not a list\"").await;
        assert!(matches!(err, Err(SettingsError::Parse(_))));
        assert_eq!(*store.snapshot().await, sample());
        assert!(!path.exists());
    }
}

//! Process configuration read from the environment.

use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_SETTINGS_PATH: &str = "settings.toml";
pub const DEFAULT_BROWSER: &str = "google-chrome";

/// Where to listen and where the service's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `NEWSDESK_ADDR`
    pub addr: String,
    /// `NEWSDESK_STATIC_DIR`
    pub static_dir: PathBuf,
    /// `NEWSDESK_SETTINGS`
    pub settings_path: PathBuf,
    /// `NEWSDESK_BROWSER`; an empty value disables the launch.
    pub browser: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            browser: Some(DEFAULT_BROWSER.to_owned()),
        }
    }
}

impl AppConfig {
    /// Overlay the `NEWSDESK_*` variables onto the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            addr: lookup("NEWSDESK_ADDR").unwrap_or(defaults.addr),
            static_dir: lookup("NEWSDESK_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            settings_path: lookup("NEWSDESK_SETTINGS")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            browser: match lookup("NEWSDESK_BROWSER") {
                Some(cmd) if cmd.trim().is_empty() => None,
                Some(cmd) => Some(cmd),
                None => defaults.browser,
            },
        }
    }

    /// The URL a browser should open.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(config(&[]), AppConfig::default());
        assert_eq!(AppConfig::default().url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = config(&[
            ("NEWSDESK_ADDR", "0.0.0.0:9000"),
            ("NEWSDESK_STATIC_DIR", "/srv/ui"),
            ("NEWSDESK_SETTINGS", "/etc/newsdesk.toml"),
            ("NEWSDESK_BROWSER", "firefox"),
        ]);
        assert_eq!(cfg.addr, "0.0.0.0:9000");
        assert_eq!(cfg.static_dir, PathBuf::from("/srv/ui"));
        assert_eq!(cfg.settings_path, PathBuf::from("/etc/newsdesk.toml"));
        assert_eq!(cfg.browser.as_deref(), Some("firefox"));
    }

    #[test]
    fn empty_browser_disables_launch() {
        assert_eq!(config(&[("NEWSDESK_BROWSER", "")]).browser, None);
    }
}

//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::DetectorSelectors;
use crate::storage::MAX_RETENTION_DAYS;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Artists, polling cadence and state retention
    #[serde(default)]
    pub watch: WatchConfig,

    /// Page fetching behavior
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Markup hooks used to detect resale availability
    #[serde(default)]
    pub detector: DetectorSelectors,

    /// Push notification settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `ARTISTS` (comma separated), `CHECK_INTERVAL` (seconds),
    /// `LINE_CHANNEL_ACCESS_TOKEN`, `LINE_USER_ID` and `DEBUG`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(artists) = lookup("ARTISTS") {
            let parsed: Vec<String> = artists
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
            if !parsed.is_empty() {
                self.watch.artists = parsed;
            }
        }

        if let Some(interval) = lookup("CHECK_INTERVAL") {
            match interval.trim().parse() {
                Ok(secs) => self.watch.check_interval_secs = secs,
                Err(_) => log::warn!("Ignoring invalid CHECK_INTERVAL: {interval}"),
            }
        }

        if let Some(token) = lookup("LINE_CHANNEL_ACCESS_TOKEN") {
            self.notifier.line_channel_access_token = token;
        }

        if let Some(user) = lookup("LINE_USER_ID") {
            self.notifier.line_user_id = user;
        }

        if let Some(debug) = lookup("DEBUG") {
            self.watch.debug = debug.trim().eq_ignore_ascii_case("true");
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.watch.base_url)?;
        if self.watch.artists.is_empty() {
            return Err(AppError::validation("watch.artists is empty"));
        }
        if self.watch.check_interval_secs == 0 {
            return Err(AppError::validation(
                "watch.check_interval_secs must be > 0",
            ));
        }
        if self.watch.retention_days == 0 {
            return Err(AppError::validation("watch.retention_days must be > 0"));
        }
        if self.watch.retention_days > MAX_RETENTION_DAYS as u64 {
            return Err(AppError::validation(format!(
                "watch.retention_days must be <= {MAX_RETENTION_DAYS}"
            )));
        }
        if self.renderer.user_agent.trim().is_empty() {
            return Err(AppError::validation("renderer.user_agent is empty"));
        }
        if self.renderer.timeout_secs == 0 {
            return Err(AppError::validation("renderer.timeout_secs must be > 0"));
        }
        if self.notifier.timeout_secs == 0 {
            return Err(AppError::validation("notifier.timeout_secs must be > 0"));
        }
        if self.detector.purchase_phrase.trim().is_empty() {
            return Err(AppError::validation("detector.purchase_phrase is empty"));
        }
        if self.detector.inactive_class.trim().is_empty() {
            return Err(AppError::validation("detector.inactive_class is empty"));
        }
        Ok(())
    }
}

/// What to watch and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Site root; artist and event paths are resolved against it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Display names of the artists to poll, in order
    #[serde(default = "defaults::artists")]
    pub artists: Vec<String>,

    /// Display name to site numeric key
    #[serde(default = "defaults::artist_ids")]
    pub artist_ids: BTreeMap<String, u32>,

    /// Delay between cycles in continuous mode
    #[serde(default = "defaults::check_interval")]
    pub check_interval_secs: u64,

    /// Age after which a notified key may fire again
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u64,

    /// Location of the persisted notification state
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,

    /// Dump rendered pages for inspection
    #[serde(default)]
    pub debug: bool,

    /// Directory for debug dumps
    #[serde(default = "defaults::debug_dir")]
    pub debug_dir: PathBuf,
}

impl WatchConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Retention window; saturates instead of overflowing.
    pub fn retention(&self) -> chrono::Duration {
        i64::try_from(self.retention_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            artists: defaults::artists(),
            artist_ids: defaults::artist_ids(),
            check_interval_secs: defaults::check_interval(),
            retention_days: defaults::retention_days(),
            state_file: defaults::state_file(),
            debug: false,
            debug_dir: defaults::debug_dir(),
        }
    }
}

/// Page fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// User-Agent header for page requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Navigation timeout in seconds
    #[serde(default = "defaults::render_timeout")]
    pub timeout_secs: u64,

    /// Wait after loading an artist index page
    #[serde(default = "defaults::index_settle")]
    pub index_settle_ms: u64,

    /// Wait after loading an event page
    #[serde(default = "defaults::event_settle")]
    pub event_settle_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::render_timeout(),
            index_settle_ms: defaults::index_settle(),
            event_settle_ms: defaults::event_settle(),
        }
    }
}

/// Push notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// LINE Messaging API push endpoint
    #[serde(default = "defaults::line_endpoint")]
    pub line_endpoint: String,

    /// Channel access token; empty disables LINE delivery
    #[serde(default)]
    pub line_channel_access_token: String,

    /// Recipient user id; empty disables LINE delivery
    #[serde(default)]
    pub line_user_id: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,

    /// Message body.
    ///
    /// Placeholders: `{artist}`, `{event}`, `{date}`, `{venue}`, `{tickets}`, `{url}`
    #[serde(default = "defaults::message_template")]
    pub message_template: String,
}

impl NotifierConfig {
    pub fn line_configured(&self) -> bool {
        !self.line_channel_access_token.trim().is_empty() && !self.line_user_id.trim().is_empty()
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            line_endpoint: defaults::line_endpoint(),
            line_channel_access_token: String::new(),
            line_user_id: String::new(),
            timeout_secs: defaults::notify_timeout(),
            message_template: defaults::message_template(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    // Watch defaults
    pub fn base_url() -> String {
        "https://relief-ticket.jp".into()
    }
    pub fn artists() -> Vec<String> {
        vec!["Travis Japan".into(), "SixTONES".into()]
    }
    pub fn artist_ids() -> BTreeMap<String, u32> {
        [
            ("Travis Japan", 38),
            ("SixTONES", 40),
            ("King & Prince", 41),
            ("中島健人", 42),
            ("ジュニア", 15),
        ]
        .into_iter()
        .map(|(name, id)| (name.to_string(), id))
        .collect()
    }
    pub fn check_interval() -> u64 {
        60
    }
    pub fn retention_days() -> u64 {
        crate::storage::DEFAULT_RETENTION_DAYS as u64
    }
    pub fn state_file() -> PathBuf {
        PathBuf::from("state.json")
    }
    pub fn debug_dir() -> PathBuf {
        PathBuf::from("debug")
    }

    // Renderer defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn render_timeout() -> u64 {
        30
    }
    pub fn index_settle() -> u64 {
        1500
    }
    pub fn event_settle() -> u64 {
        2000
    }

    // Notifier defaults
    pub fn line_endpoint() -> String {
        "https://api.line.me/v2/bot/message/push".into()
    }
    pub fn notify_timeout() -> u64 {
        10
    }
    pub fn message_template() -> String {
        "🎫 Resale tickets listed!\n\n【{artist}】\n{event}\n📅 {date}\n📍 {venue}\n🎟 {tickets}\n\n▶ Purchase page:\n{url}".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.watch.check_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_retention() {
        let mut config = Config::default();
        config.watch.retention_days = MAX_RETENTION_DAYS as u64;
        assert!(config.validate().is_ok());

        config.watch.retention_days = 200_000_000_000_000;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn retention_saturates_on_huge_values() {
        let mut config = Config::default();
        config.watch.retention_days = u64::MAX;
        assert_eq!(config.watch.retention(), chrono::Duration::MAX);

        config.watch.retention_days = 30;
        assert_eq!(config.watch.retention(), chrono::Duration::days(30));
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.watch.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(AppError::Url(_))));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [watch]
            artists = ["SixTONES"]
            check_interval_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.watch.artists, vec!["SixTONES"]);
        assert_eq!(config.watch.check_interval_secs, 120);
        assert_eq!(config.watch.retention_days, 30);
        assert_eq!(config.watch.artist_ids.get("SixTONES"), Some(&40));
        assert_eq!(config.detector.inactive_class, "text-muted");
    }

    #[test]
    fn example_config_parses() {
        let config: Config = toml::from_str(include_str!("../../config.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.watch.artist_ids.get("中島健人"), Some(&42));
        assert!(!config.notifier.line_configured());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("ARTISTS", " SixTONES , King & Prince ,"),
            ("CHECK_INTERVAL", "300"),
            ("LINE_CHANNEL_ACCESS_TOKEN", "token"),
            ("LINE_USER_ID", "U123"),
            ("DEBUG", "TRUE"),
        ]));

        assert_eq!(config.watch.artists, vec!["SixTONES", "King & Prince"]);
        assert_eq!(config.watch.check_interval_secs, 300);
        assert!(config.notifier.line_configured());
        assert!(config.watch.debug);
    }

    #[test]
    fn invalid_interval_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("CHECK_INTERVAL", "soon")]));
        assert_eq!(config.watch.check_interval_secs, 60);
    }
}

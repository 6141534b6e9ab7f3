use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::ConfigError;

/// The one validated configuration, built once per process and passed by
/// reference into the pipeline and its collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub omdb: Option<OmdbConfig>,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_trakt_username")]
    pub username: String,
    /// Bearer token for private profiles; taken as given, never refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    #[serde(default = "default_trakt_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_poster_size")]
    pub poster_size: String,
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_tmdb_image_base_url")]
    pub image_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmdbConfig {
    pub api_key: String,
    #[serde(default = "default_omdb_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Telegram username linked from the first message (without `@`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_message_delay_ms")]
    pub message_delay_ms: u64,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
    /// Prune notification records older than this many days; unset keeps them forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<u32>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_trakt_username() -> String {
    "me".to_string()
}

fn default_history_limit() -> u32 {
    5
}

fn default_trakt_base_url() -> String {
    "https://api.trakt.tv".to_string()
}

fn default_poster_size() -> String {
    "w500".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_omdb_base_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_display_name() -> String {
    "Someone".to_string()
}

fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_message_delay_ms() -> u64 {
    500
}

fn default_utc_offset_hours() -> i32 {
    7
}

fn default_zone_label() -> String {
    "WIB".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_lock_stale_minutes() -> u64 {
    30
}

fn default_schedule() -> String {
    "0 */10 * * * *".to_string() // Every 10 minutes (cron with seconds)
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            username: default_trakt_username(),
            access_token: None,
            history_limit: default_history_limit(),
            base_url: default_trakt_base_url(),
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            poster_size: default_poster_size(),
            base_url: default_tmdb_base_url(),
            image_base_url: default_tmdb_image_base_url(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            display_name: default_display_name(),
            handle: None,
            base_url: default_telegram_base_url(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            message_delay_ms: default_message_delay_ms(),
            utc_offset_hours: default_utc_offset_hours(),
            zone_label: default_zone_label(),
            retention_days: None,
            http_timeout_secs: default_http_timeout_secs(),
            lock_stale_minutes: default_lock_stale_minutes(),
            state_file: None,
        }
    }
}

/// Unset, blank, or still the template placeholder
fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with("YOUR_")
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

impl Config {
    /// Load from `path` (when it exists), overlay the process environment, validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over the file
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_blank);

        if let Some(v) = get("TRAKT_CLIENT_ID") {
            self.trakt.client_id = v;
        }
        if let Some(v) = get("TRAKT_USERNAME") {
            self.trakt.username = v;
        }
        if let Some(v) = get("TRAKT_ACCESS_TOKEN") {
            self.trakt.access_token = Some(v);
        }
        if let Some(v) = get("TMDB_API_KEY") {
            self.tmdb.api_key = v;
        }
        if let Some(v) = get("OMDB_API_KEY") {
            match self.omdb.as_mut() {
                Some(omdb) => omdb.api_key = v,
                None => {
                    self.omdb = Some(OmdbConfig {
                        api_key: v,
                        base_url: default_omdb_base_url(),
                    })
                }
            }
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = get("TELEGRAM_USERNAME") {
            self.telegram.handle = Some(v);
        }
        if let Some(v) = get("TELEGRAM_USER_DISPLAY") {
            self.telegram.display_name = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Required credentials, checked before any network call
        if is_placeholder(&self.trakt.client_id) {
            return Err(ConfigError::Missing("trakt.client_id"));
        }
        if is_placeholder(&self.tmdb.api_key) {
            return Err(ConfigError::Missing("tmdb.api_key"));
        }
        if is_placeholder(&self.telegram.bot_token) {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if is_placeholder(&self.telegram.chat_id) {
            return Err(ConfigError::Missing("telegram.chat_id"));
        }

        if self.trakt.username.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "trakt.username",
                reason: "must not be empty (use \"me\" for the token owner)".to_string(),
            });
        }
        if self.trakt.history_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "trakt.history_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(-12..=14).contains(&self.pipeline.utc_offset_hours) {
            return Err(ConfigError::Invalid {
                field: "pipeline.utc_offset_hours",
                reason: format!("{} is outside -12..=14", self.pipeline.utc_offset_hours),
            });
        }
        if self.pipeline.zone_label.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "pipeline.zone_label",
                reason: "must not be empty".to_string(),
            });
        }
        if self.pipeline.retention_days == Some(0) {
            return Err(ConfigError::Invalid {
                field: "pipeline.retention_days",
                reason: "must be at least 1 (remove the setting to keep records forever)".to_string(),
            });
        }
        if let Some(omdb) = &self.omdb {
            if is_placeholder(&omdb.api_key) {
                return Err(ConfigError::Missing("omdb.api_key"));
            }
        }

        Ok(())
    }

    /// Optional IMDb ratings lookup is enabled
    pub fn is_omdb_configured(&self) -> bool {
        self.omdb.as_ref().map(|o| !is_placeholder(&o.api_key)).unwrap_or(false)
    }

    /// Copy with every secret masked, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.trakt.client_id = mask(&copy.trakt.client_id);
        copy.trakt.access_token = copy.trakt.access_token.as_deref().map(mask);
        copy.tmdb.api_key = mask(&copy.tmdb.api_key);
        if let Some(omdb) = copy.omdb.as_mut() {
            omdb.api_key = mask(&omdb.api_key);
        }
        copy.telegram.bot_token = mask(&copy.telegram.bot_token);
        copy
    }

    /// Template written by `config init`
    pub fn template() -> Self {
        let mut config = Self::default();
        config.trakt.client_id = "YOUR_CLIENT_ID".to_string();
        config.tmdb.api_key = "YOUR_TMDB_API_KEY".to_string();
        config.telegram.bot_token = "YOUR_BOT_TOKEN".to_string();
        config.telegram.chat_id = "YOUR_CHAT_ID".to_string();
        config.scheduler = Some(default_scheduler_config());
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TRAKT_CLIENT_ID", "client-123"),
            ("TMDB_API_KEY", "tmdb-456"),
            ("TELEGRAM_BOT_TOKEN", "123456:ABCDEF"),
            ("TELEGRAM_CHAT_ID", "-100200300"),
        ]
    }

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::template();
        config.trakt.client_id = "test_id".to_string();
        config.trakt.history_limit = 10;
        config.pipeline.retention_days = Some(90);

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.trakt.client_id, "test_id");
        assert_eq!(loaded.trakt.history_limit, 10);
        assert_eq!(loaded.pipeline.retention_days, Some(90));
        assert_eq!(loaded.pipeline.zone_label, "WIB");
        assert!(loaded.scheduler.is_some());
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"").unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.trakt.username, "me");
        assert_eq!(config.trakt.history_limit, 5);
        assert_eq!(config.pipeline.message_delay_ms, 500);
        assert_eq!(config.pipeline.utc_offset_hours, 7);
        assert_eq!(config.tmdb.poster_size, "w500");
        assert!(config.omdb.is_none());
    }

    #[test]
    fn test_load_with_env_only() {
        let missing = std::path::Path::new("/nonexistent/watchnotify/config.toml");
        let config = Config::load_with_env(missing, env(&required_env())).unwrap();
        assert_eq!(config.trakt.client_id, "client-123");
        assert_eq!(config.telegram.chat_id, "-100200300");
        assert!(!config.is_omdb_configured());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"[trakt]\nclient_id = \"from-file\"\nusername = \"alice\"\n\n[telegram]\ndisplay_name = \"Alice\"\n",
        )
        .unwrap();

        let mut pairs = required_env();
        pairs.push(("TELEGRAM_USERNAME", "alice_tg"));
        pairs.push(("OMDB_API_KEY", "omdb-789"));
        let config = Config::load_with_env(file.path(), env(&pairs)).unwrap();

        assert_eq!(config.trakt.client_id, "client-123");
        assert_eq!(config.trakt.username, "alice");
        assert_eq!(config.telegram.display_name, "Alice");
        assert_eq!(config.telegram.handle.as_deref(), Some("alice_tg"));
        assert!(config.is_omdb_configured());
    }

    #[test]
    fn test_missing_credential_is_reported() {
        let missing = std::path::Path::new("/nonexistent/watchnotify/config.toml");
        let pairs: Vec<_> = required_env()
            .into_iter()
            .filter(|(k, _)| *k != "TELEGRAM_BOT_TOKEN")
            .collect();
        let err = Config::load_with_env(missing, env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("telegram.bot_token")));
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::template();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("trakt.client_id"))));

        config.apply_env(env(&required_env()));
        assert!(config.validate().is_ok());

        config.pipeline.utc_offset_hours = 15;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "pipeline.utc_offset_hours", .. })));
        config.pipeline.utc_offset_hours = 7;

        config.trakt.history_limit = 0;
        assert!(config.validate().is_err());
        config.trakt.history_limit = 5;

        config.pipeline.retention_days = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_hides_secrets() {
        let mut config = Config::default();
        config.apply_env(env(&required_env()));
        config.trakt.access_token = Some("abc".to_string());

        let masked = config.masked();
        assert_eq!(masked.trakt.client_id, "clie****");
        assert_eq!(masked.telegram.bot_token, "1234****");
        assert_eq!(masked.trakt.access_token.as_deref(), Some("****"));
        // Non-secret values are untouched
        assert_eq!(masked.telegram.chat_id, "-100200300");
    }
}

//! Configuration management for the tavolo watcher
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::schedule::QuietWindow;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Availability source configuration
    pub source: SourceConfig,

    /// Poll engine configuration
    pub engine: EngineConfig,

    /// Quiet window configuration
    pub schedule: ScheduleConfig,

    /// Telegram bot configuration
    pub telegram: TelegramConfig,

    /// Persistence configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Availability source configuration
///
/// The date window and party size are fixed per deployment; the engine never
/// varies them between cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Full URL of the AvailabilityForDateRange endpoint
    pub url: String,

    /// First date of the watched window
    pub date_from: NaiveDate,

    /// Last date of the watched window
    pub date_to: NaiveDate,

    /// Party size to check availability for
    pub party_size: u32,

    /// Booking channel code sent with every request
    pub channel_code: String,

    /// Optional area filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_id: Option<i64>,

    /// Optional promotion filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<i64>,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Poll engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between polls while Active
    pub poll_interval_secs: u64,

    /// Seconds between clock re-checks while Quiet
    pub quiet_recheck_secs: u64,

    /// Base backoff delay in seconds (delay = base * 2^level, capped)
    pub backoff_base_secs: u64,

    /// Ceiling for the backoff delay in seconds
    pub backoff_cap_secs: u64,

    /// Maximum concurrent sends within one broadcast
    pub dispatch_concurrency: usize,

    /// Broadcast a notice to subscribers when the source is unavailable.
    /// Off by default: source failures surface through status and logs only.
    pub notify_on_source_failure: bool,
}

/// Quiet window configuration (local wall-clock time, `HH:MM`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Start of the quiet window
    pub quiet_start: String,

    /// End of the quiet window
    pub quiet_end: String,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token; read from `BOT_TOKEN` when not set in the file
    pub bot_token: String,

    /// API base URL; override for mock-server tests
    pub api_base: String,

    /// Long-poll timeout for getUpdates, in seconds
    pub update_timeout_secs: u64,
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding seen.json, status.json and subscribers.json
    pub data_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TAVOLO_SOURCE_URL") {
            config.source.url = url;
        }
        if let Some(date) = parse_env_date("TAVOLO_DATE_FROM")? {
            config.source.date_from = date;
        }
        if let Some(date) = parse_env_date("TAVOLO_DATE_TO")? {
            config.source.date_to = date;
        }
        if let Some(size) = parse_env_num::<u32>("TAVOLO_PARTY_SIZE") {
            config.source.party_size = size;
        }
        if let Ok(code) = std::env::var("TAVOLO_CHANNEL_CODE") {
            config.source.channel_code = code;
        }

        if let Some(secs) = parse_env_num::<u64>("TAVOLO_POLL_INTERVAL") {
            config.engine.poll_interval_secs = secs;
        }
        if let Some(secs) = parse_env_num::<u64>("TAVOLO_QUIET_RECHECK") {
            config.engine.quiet_recheck_secs = secs;
        }
        if let Some(secs) = parse_env_num::<u64>("TAVOLO_BACKOFF_CAP") {
            config.engine.backoff_cap_secs = secs;
        }

        if let Ok(start) = std::env::var("TAVOLO_QUIET_START") {
            config.schedule.quiet_start = start;
        }
        if let Ok(end) = std::env::var("TAVOLO_QUIET_END") {
            config.schedule.quiet_end = end;
        }

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.telegram.bot_token = token;
        }
        if let Ok(base) = std::env::var("TAVOLO_TELEGRAM_API") {
            config.telegram.api_base = base;
        }

        if let Ok(dir) = std::env::var("TAVOLO_DATA_DIR") {
            config.storage.data_dir = dir.into();
        }

        if let Ok(level) = std::env::var("TAVOLO_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("TAVOLO_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        // The token never lives in the file; the environment wins regardless
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.telegram.bot_token = token;
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.url)
            .with_context(|| format!("source.url is not a valid URL: {}", self.source.url))?;

        url::Url::parse(&self.telegram.api_base).with_context(|| {
            format!(
                "telegram.api_base is not a valid URL: {}",
                self.telegram.api_base
            )
        })?;

        if self.source.party_size == 0 {
            anyhow::bail!("party_size must be greater than 0");
        }

        if self.source.date_to < self.source.date_from {
            anyhow::bail!("date_to must not precede date_from");
        }

        if self.engine.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than 0");
        }

        if self.engine.backoff_cap_secs == 0 {
            anyhow::bail!("backoff_cap_secs must be greater than 0");
        }

        if self.engine.dispatch_concurrency == 0 {
            anyhow::bail!("dispatch_concurrency must be greater than 0");
        }

        self.quiet_window()
            .context("schedule section is invalid")?;

        Ok(())
    }

    /// Parse the configured quiet window
    pub fn quiet_window(&self) -> Result<QuietWindow> {
        QuietWindow::parse(&self.schedule.quiet_start, &self.schedule.quiet_end)
            .map_err(|e| anyhow::anyhow!(e))
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs)
    }

    /// Get active poll interval as Duration
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.engine.poll_interval_secs)
    }

    /// Get quiet re-check interval as Duration
    #[must_use]
    pub fn quiet_recheck(&self) -> Duration {
        Duration::from_secs(self.engine.quiet_recheck_secs)
    }
}

impl StorageConfig {
    /// Path of the durable seen-set file
    pub fn seen_path(&self) -> PathBuf {
        self.data_dir.join("seen.json")
    }

    /// Path of the poll status snapshot file
    pub fn status_path(&self) -> PathBuf {
        self.data_dir.join("status.json")
    }

    /// Path of the subscriber registry file
    pub fn subscribers_path(&self) -> PathBuf {
        self.data_dir.join("subscribers.json")
    }
}

fn parse_env_num<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn parse_env_date(key: &str) -> Result<Option<NaiveDate>> {
    match std::env::var(key) {
        Ok(raw) => {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("{key} is not a YYYY-MM-DD date: {raw}"))?;
            Ok(Some(date))
        }
        Err(_) => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            engine: EngineConfig::default(),
            schedule: ScheduleConfig::default(),
            telegram: TelegramConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::from(
                "https://booking.resdiary.com/api/Restaurant/TRATTORIATRIPPA/AvailabilityForDateRange",
            ),
            date_from: NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid default date"),
            date_to: NaiveDate::from_ymd_opt(2025, 12, 12).expect("valid default date"),
            party_size: 2,
            channel_code: String::from("ONLINE"),
            area_id: None,
            promotion_id: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            quiet_recheck_secs: 600,
            backoff_base_secs: 1,
            backoff_cap_secs: 300,
            dispatch_concurrency: 4,
            notify_on_source_failure: false,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            quiet_start: String::from("00:00"),
            quiet_end: String::from("08:00"),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: String::from("https://api.telegram.org"),
            update_timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_party_size() {
        let mut config = Config::default();
        config.source.party_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_date_window() {
        let mut config = Config::default();
        config.source.date_from = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        config.source.date_to = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_quiet_window() {
        let mut config = Config::default();
        config.schedule.quiet_start = String::from("25:00");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/var/lib/tavolo"),
        };

        assert_eq!(storage.seen_path(), PathBuf::from("/var/lib/tavolo/seen.json"));
        assert_eq!(
            storage.subscribers_path(),
            PathBuf::from("/var/lib/tavolo/subscribers.json")
        );
    }

    #[test]
    fn test_duration_accessors() {
        let config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.quiet_recheck(), Duration::from_secs(600));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.source.url, config.source.url);
        assert_eq!(parsed.engine.poll_interval_secs, 300);
        assert_eq!(parsed.schedule.quiet_end, "08:00");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [engine]
            poll_interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(parsed.engine.poll_interval_secs, 60);
        assert_eq!(parsed.engine.backoff_cap_secs, 300);
        assert_eq!(parsed.source.party_size, 2);
    }
}

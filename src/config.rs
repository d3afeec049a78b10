//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the constants shared by both bots.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Base URL of the CoinGecko API
    #[serde(default = "default_coingecko_api_url")]
    pub coingecko_api_url: String,
    /// Timeout applied to every price API request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Interval between two alert scans
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Minimum interval between two writes of the data file
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Path of the JSON file holding users and alerts
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Directory where downloaded media is staged before sending
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
    /// Upper bound for a single download
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Number of downloads allowed to run at once
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    /// Largest file the bot tries to upload
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Deliver Instagram downloads to the user.
    ///
    /// Off by default: Instagram media is downloaded and then withheld.
    #[serde(default)]
    pub instagram_delivery: bool,
}

fn default_coingecko_api_url() -> String {
    COINGECKO_API_URL.to_string()
}

const fn default_http_timeout_secs() -> u64 {
    10
}

const fn default_check_interval_secs() -> u64 {
    300
}

const fn default_flush_interval_secs() -> u64 {
    5
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

const fn default_download_timeout_secs() -> u64 {
    600
}

const fn default_max_concurrent_downloads() -> usize {
    2
}

const fn default_max_upload_bytes() -> u64 {
    TELEGRAM_UPLOAD_LIMIT_BYTES
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use coin_media_bots::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // `APP__CHECK_INTERVAL_SECS=60` sets `check_interval_secs`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain UPPER_SNAKE_CASE variables, empty values treated as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        if settings.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message("TELEGRAM_TOKEN is empty".into()));
        }
        Ok(settings)
    }

    /// Timeout for price API requests
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Interval between alert scans, never shorter than one second
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    /// Minimum interval between data file writes, never shorter than one second
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    /// Upper bound for one download
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Default CoinGecko API endpoint
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Bot API limit for files uploaded by a bot (50 MiB)
pub const TELEGRAM_UPLOAD_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

// Telegram API retry configuration
/// Initial backoff for retried Telegram calls
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for retried Telegram calls
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Attempts for one Telegram call
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

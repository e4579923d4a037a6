//! Configuration management for the autoposter
//!
//! This module handles loading and validating configuration from a TOML file
//! and environment variables. Every field has a default, so a partial file is
//! valid; secrets are usually supplied through the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publishing cadence and retry settings
    pub publishing: PublishingConfig,

    /// Loop timing and circuit breaker settings
    pub system: SystemConfig,

    /// File locations
    pub paths: PathsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Text generation API
    pub generator: GeneratorConfig,

    /// Blog platform
    pub wordpress: WordPressConfig,

    /// Messaging channel
    pub telegram: TelegramConfig,
}

/// Publishing cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishingConfig {
    /// Number of posts per calendar day
    pub posts_per_day: u32,

    /// Publish window `[start_hour, end_hour)`
    pub publish_window: (u32, u32),

    /// Minimum gap between posts in seconds
    pub interval_min: u64,

    /// Maximum gap between posts in seconds (informational)
    pub interval_max: u64,

    /// Pause between consecutive catch-up posts in seconds
    pub post_delay: u64,

    /// Pause after an unexpected loop error in seconds
    pub cycle_restart_delay: u64,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Base backoff delay in seconds
    pub retry_delay: u64,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            posts_per_day: 3,
            publish_window: (8, 20),
            interval_min: 1800,
            interval_max: 10800,
            post_delay: 60,
            cycle_restart_delay: 60,
            max_retries: 3,
            retry_delay: 300,
        }
    }
}

impl PublishingConfig {
    /// First hour of the publish window
    pub fn window_start(&self) -> u32 {
        self.publish_window.0
    }

    /// Hour at which the publish window closes
    pub fn window_end(&self) -> u32 {
        self.publish_window.1
    }
}

/// Loop timing and circuit breaker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Sleep chunk for control command polling in seconds
    pub check_interval: u64,

    /// Liveness artifact refresh period in seconds
    pub health_check_interval: u64,

    /// Consecutive failures that open a service's circuit
    pub circuit_breaker_threshold: u32,

    /// Seconds a circuit stays open
    pub circuit_breaker_timeout: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            check_interval: 60,
            health_check_interval: 300,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: 1800,
        }
    }
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// SQLite history store
    pub database: PathBuf,

    /// Theme catalog (JSON)
    pub themes: PathBuf,

    /// Root of the per-brand product image folders
    pub images: PathBuf,

    /// Directory watched for control marker files
    pub control_dir: PathBuf,

    /// Liveness artifact
    pub health_file: PathBuf,

    /// Watermark drawn on product images; unset disables watermarking
    pub watermark: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("autoposter.db"),
            themes: PathBuf::from("theme_host.json"),
            images: PathBuf::from("img"),
            control_dir: PathBuf::from("."),
            health_file: PathBuf::from("autoposter.health"),
            watermark: Some(PathBuf::from("watermark.png")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Optional log file receiving a copy of every event
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
            file: Some(PathBuf::from("logs/autoposter.log")),
        }
    }
}

/// Text generation API (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL, e.g. `https://api.vsegpt.ru/v1`
    pub url: String,

    pub api_key: String,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: String::from("https://api.vsegpt.ru/v1"),
            api_key: String::new(),
            model: String::from("openai/gpt-4.1-mini"),
            timeout_secs: 180,
        }
    }
}

/// Blog platform (WordPress REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    /// Site root, e.g. `https://example.com`
    pub url: String,

    pub user: String,

    /// Application password
    pub password: String,

    /// Category assigned to every post
    pub category_id: u64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            category_id: 50,
            timeout_secs: 60,
        }
    }
}

/// Messaging channel (Telegram Bot API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,

    /// Channel or chat id, e.g. `@my_channel`
    pub chat_id: String,

    /// API root, overridable for tests
    pub api_url: String,

    /// Timeout for text messages in seconds
    pub timeout_secs: u64,

    /// Timeout for photo uploads in seconds
    pub image_timeout_secs: u64,

    /// Leading text of every summary
    pub prefix: String,

    /// Closing line appended to every summary
    pub suffix: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_url: String::from("https://api.telegram.org"),
            timeout_secs: 30,
            image_timeout_secs: 60,
            prefix: String::from("🌐 GVN "),
            suffix: String::from("• More at GVN.biz •"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse TOML config file {}: {e}",
                path.display()
            ))
        })?;

        Ok(config)
    }

    /// Load, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override secrets and endpoints from environment variables
    pub fn apply_env(&mut self) {
        fn set(target: &mut String, key: &str) {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    *target = value;
                }
            }
        }

        set(&mut self.generator.api_key, "AUTOPOSTER_GENERATOR_API_KEY");
        set(&mut self.generator.url, "AUTOPOSTER_GENERATOR_URL");
        set(&mut self.wordpress.url, "AUTOPOSTER_WORDPRESS_URL");
        set(&mut self.wordpress.user, "AUTOPOSTER_WORDPRESS_USER");
        set(&mut self.wordpress.password, "AUTOPOSTER_WORDPRESS_PASSWORD");
        set(&mut self.telegram.token, "AUTOPOSTER_TELEGRAM_TOKEN");
        set(&mut self.telegram.chat_id, "AUTOPOSTER_TELEGRAM_CHAT_ID");
        set(&mut self.logging.level, "AUTOPOSTER_LOG_LEVEL");
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let publishing = &self.publishing;
        if publishing.posts_per_day == 0 {
            return Err(Error::config("posts_per_day must be at least 1"));
        }

        let (start, end) = publishing.publish_window;
        if start >= end {
            return Err(Error::config(format!(
                "publish_window start ({start}) must be before end ({end})"
            )));
        }
        // slots are times of day, so the last one must fall before midnight
        if end > 23 {
            return Err(Error::config(format!(
                "publish_window end ({end}) must be at most 23"
            )));
        }

        if self.system.check_interval == 0 {
            return Err(Error::config("check_interval must be greater than 0"));
        }

        if self.system.health_check_interval == 0 {
            return Err(Error::config("health_check_interval must be greater than 0"));
        }

        if self.system.circuit_breaker_threshold == 0 {
            return Err(Error::config("circuit_breaker_threshold must be at least 1"));
        }

        Ok(())
    }

    /// Minimum gap between posts
    #[must_use]
    pub fn interval_min(&self) -> Duration {
        Duration::from_secs(self.publishing.interval_min)
    }

    /// Pause between catch-up posts
    #[must_use]
    pub fn post_delay(&self) -> Duration {
        Duration::from_secs(self.publishing.post_delay)
    }

    /// Pause after an unexpected loop error
    #[must_use]
    pub fn cycle_restart_delay(&self) -> Duration {
        Duration::from_secs(self.publishing.cycle_restart_delay)
    }

    /// Longest single sleep while waiting, so commands and shutdown stay responsive
    #[must_use]
    pub fn poll_chunk(&self) -> Duration {
        Duration::from_secs(
            self.system
                .check_interval
                .min(self.system.health_check_interval),
        )
    }

    /// Liveness artifact refresh period
    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.system.health_check_interval)
    }
}

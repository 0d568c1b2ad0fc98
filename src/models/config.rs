//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable carrying the bot token.
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// Environment variable carrying the target chat identifier.
pub const CHAT_ID_ENV: &str = "CHAT_ID";

/// Largest accepted `telegram.max_attempts`.
pub const MAX_SEND_ATTEMPTS: u32 = 10;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Link and title extraction rules
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Dedup store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Messaging endpoint settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Listing pages to poll, visited in order
    #[serde(default = "defaults::sites")]
    pub sites: Vec<String>,
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

    /// Override credentials from `BOT_TOKEN` / `CHAT_ID` when they are set.
    pub fn apply_env(&mut self) {
        if let Some(token) = non_empty_env(BOT_TOKEN_ENV) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = non_empty_env(CHAT_ID_ENV) {
            self.telegram.chat_id = chat_id;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.max_new_per_site == 0 {
            return Err(AppError::validation("crawler.max_new_per_site must be > 0"));
        }
        if self.extract.notice_keywords.is_empty() {
            return Err(AppError::validation("extract.notice_keywords is empty"));
        }
        if self.store.max_entries_per_site == 0 {
            return Err(AppError::validation(
                "store.max_entries_per_site must be > 0",
            ));
        }
        if self.telegram.chunk_chars == 0 {
            return Err(AppError::validation("telegram.chunk_chars must be > 0"));
        }
        if !(1..=MAX_SEND_ATTEMPTS).contains(&self.telegram.max_attempts) {
            return Err(AppError::validation(format!(
                "telegram.max_attempts must be between 1 and {MAX_SEND_ATTEMPTS}"
            )));
        }
        if self.sites.is_empty() {
            return Err(AppError::validation("No sites defined"));
        }
        for site in &self.sites {
            let parsed = url::Url::parse(site)?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::validation(format!(
                    "site {site} must use http or https"
                )));
            }
        }
        Ok(())
    }

    /// Check that the messaging credentials are present.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(AppError::config(format!(
                "missing bot token (set {BOT_TOKEN_ENV})"
            )));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(AppError::config(format!(
                "missing chat id (set {CHAT_ID_ENV})"
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            extract: ExtractConfig::default(),
            store: StoreConfig::default(),
            telegram: TelegramConfig::default(),
            sites: defaults::sites(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// How the fetch delay is applied across concurrent workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Every request sleeps the delay on its own before going out.
    #[default]
    PerRequest,
    /// Request starts are spaced by the delay across all workers.
    Shared,
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay before each request in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Detail pages processed at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// New notices handled per site and run; the rest wait for the next run
    #[serde(default = "defaults::max_new_per_site")]
    pub max_new_per_site: usize,

    #[serde(default)]
    pub pacing: Pacing,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            max_new_per_site: defaults::max_new_per_site(),
            pacing: Pacing::default(),
        }
    }
}

/// Keyword and extension rules for link discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Substrings marking an anchor as a notice (matched case-insensitively)
    #[serde(default = "defaults::notice_keywords")]
    pub notice_keywords: Vec<String>,

    /// Substrings marking an href as a downloadable attachment
    #[serde(default = "defaults::attachment_extensions")]
    pub attachment_extensions: Vec<String>,

    /// Maximum title length in characters
    #[serde(default = "defaults::title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            notice_keywords: defaults::notice_keywords(),
            attachment_extensions: defaults::attachment_extensions(),
            title_max_chars: defaults::title_max_chars(),
        }
    }
}

/// Dedup store persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File name of the seen-notice snapshot, relative to the storage dir
    #[serde(default = "defaults::seen_file")]
    pub seen_file: String,

    /// Identifiers retained per site
    #[serde(default = "defaults::max_entries_per_site")]
    pub max_entries_per_site: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seen_file: defaults::seen_file(),
            max_entries_per_site: defaults::max_entries_per_site(),
        }
    }
}

/// Telegram bot endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Bot token; usually supplied through `BOT_TOKEN`
    #[serde(default)]
    pub bot_token: String,

    /// Target chat; usually supplied through `CHAT_ID`
    #[serde(default)]
    pub chat_id: String,

    /// Per-send timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Send attempts per chunk, first try included
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; attempt n waits `retry_base_ms * 2^(n-1)` before retrying
    #[serde(default = "defaults::retry_base")]
    pub retry_base_ms: u64,

    /// Maximum characters per message
    #[serde(default = "defaults::chunk_chars")]
    pub chunk_chars: usize,

    /// Pause between consecutive chunk sends in milliseconds
    #[serde(default = "defaults::chunk_pause")]
    pub chunk_pause_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            bot_token: String::new(),
            chat_id: String::new(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            retry_base_ms: defaults::retry_base(),
            chunk_chars: defaults::chunk_chars(),
            chunk_pause_ms: defaults::chunk_pause(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/120 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn max_concurrent() -> usize {
        3
    }
    pub fn max_new_per_site() -> usize {
        10
    }

    // Extraction defaults
    pub fn notice_keywords() -> Vec<String> {
        [
            "notice",
            "सूचना",
            "announcement",
            "vacancy",
            "रिक्त",
            "result",
            "नतिजा",
            "admission",
            "भर्ना",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn attachment_extensions() -> Vec<String> {
        [".pdf", ".jpg", ".jpeg", ".png", ".doc", ".docx"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn title_max_chars() -> usize {
        100
    }

    // Store defaults
    pub fn seen_file() -> String {
        "seen_notices.json".into()
    }
    pub fn max_entries_per_site() -> usize {
        1000
    }

    // Telegram defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn retry_base() -> u64 {
        1000
    }
    pub fn chunk_chars() -> usize {
        3500
    }
    pub fn chunk_pause() -> u64 {
        1000
    }

    // Site defaults
    pub fn sites() -> Vec<String> {
        vec![
            "https://madhyabindumun.gov.np/en/search/node/notice".into(),
            "https://kawasotimun.gov.np/search/node/notice".into(),
            "https://gaindakotmun.gov.np/en/search/node/notice".into(),
            "https://devchulimun.gov.np/search/node/notice".into(),
        ]
    }
}

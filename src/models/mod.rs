// src/models/mod.rs

//! Domain models for the notice watcher.

mod config;
mod notice;

// Re-export all public types
pub use config::{
    BOT_TOKEN_ENV, CHAT_ID_ENV, Config, CrawlerConfig, ExtractConfig, Pacing, StoreConfig,
    TelegramConfig,
};
pub use notice::{DEFAULT_TITLE, NoticeLink, ProcessedNotice, RunSummary, SiteReport, format_message};

//! Service layer for the notice watcher.
//!
//! This module contains the business logic for:
//! - Paced page fetching (`HttpFetcher`)
//! - Notice and attachment link discovery (`LinkExtractor`)
//! - Concurrent detail-page processing (`NoticeProcessor`)
//! - Chunked, retried delivery to Telegram (`Dispatcher`)

mod dispatch;
mod extract;
mod fetcher;
mod processor;

pub use dispatch::{
    DispatchReport, Dispatcher, MAX_BACKOFF, MESSAGE_SEPARATOR, Messenger, TelegramMessenger, chunk_text,
};
pub use extract::LinkExtractor;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use processor::{NoticeProcessor, ProcessOutcome};

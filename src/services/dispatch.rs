// src/services/dispatch.rs

//! Notification dispatch to the Telegram bot API.
//!
//! Messages of one site are joined into a single blob, cut into fixed-size
//! chunks and sent one by one. Each chunk is retried with exponential
//! backoff; a chunk that still fails is logged and dropped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::TransportError;
use crate::models::TelegramConfig;

/// Separator placed between messages in a dispatch blob.
pub const MESSAGE_SEPARATOR: &str = "\n\n";

/// Upper bound on the wait between two send attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Outbound chat endpoint.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver one chunk of text. Single attempt, no retry.
    async fn send(&self, text: &str) -> Result<(), TransportError>;
}

/// `Messenger` posting to `sendMessage` of a Telegram bot.
pub struct TelegramMessenger {
    client: Client,
    endpoint: String,
    chat_id: String,
    timeout: Duration,
}

impl TelegramMessenger {
    pub fn new(client: Client, config: &TelegramConfig) -> Self {
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            client,
            endpoint,
            chat_id: config.chat_id.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let result = async {
            self.client
                .post(&self.endpoint)
                .timeout(self.timeout)
                .form(&form[..])
                .send()
                .await?
                .error_for_status()
        }
        .await;

        // The endpoint embeds the bot token; keep it out of logs and errors.
        result
            .map(|_| ())
            .map_err(|e| TransportError::from_reqwest("telegram:sendMessage", &e.without_url()))
    }
}

/// Counts from dispatching one site's messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub dropped: usize,
}

/// Chunks, paces and retries outbound messages.
pub struct Dispatcher<M> {
    messenger: M,
    chunk_chars: usize,
    max_attempts: u32,
    retry_base: Duration,
    chunk_pause: Duration,
}

impl<M: Messenger> Dispatcher<M> {
    pub fn new(messenger: M, config: &TelegramConfig) -> Self {
        Self {
            messenger,
            chunk_chars: config.chunk_chars.max(1),
            max_attempts: config.max_attempts.max(1),
            retry_base: Duration::from_millis(config.retry_base_ms),
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
        }
    }

    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// Send all messages of a site, chunked, pausing between chunks.
    pub async fn dispatch(&self, messages: &[String]) -> DispatchReport {
        let mut report = DispatchReport::default();
        if messages.is_empty() {
            return report;
        }

        let combined = messages.join(MESSAGE_SEPARATOR);
        let chunks = chunk_text(&combined, self.chunk_chars);
        log::debug!(
            "Dispatching {} chars in {} chunk(s)",
            combined.chars().count(),
            chunks.len()
        );

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !self.chunk_pause.is_zero() {
                tokio::time::sleep(self.chunk_pause).await;
            }
            if self.send_with_retry(chunk).await {
                report.sent += 1;
            } else {
                report.dropped += 1;
            }
        }
        report
    }

    /// Send one chunk, retrying with exponential backoff.
    ///
    /// Returns whether the chunk was delivered.
    pub async fn send_with_retry(&self, text: &str) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.messenger.send(text).await {
                Ok(()) => {
                    log::info!("Sent Telegram message ({} chars)", text.chars().count());
                    return true;
                }
                Err(e) if attempt == self.max_attempts => {
                    log::error!(
                        "Telegram error after {} attempts: {}",
                        self.max_attempts,
                        e
                    );
                }
                Err(e) => {
                    let backoff = self.backoff(attempt);
                    log::warn!(
                        "Telegram attempt {} to {} failed ({}), retrying in {:?}",
                        attempt,
                        e.url(),
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
        false
    }

    /// Wait after the given failed attempt: `retry_base * 2^(attempt - 1)`,
    /// capped at [`MAX_BACKOFF`].
    fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.retry_base.checked_mul(factor))
            .map_or(MAX_BACKOFF, |wait| wait.min(MAX_BACKOFF))
    }
}

/// Split `text` into consecutive pieces of at most `max_chars` characters.
///
/// A plain character-count cut: it may split a message or an HTML tag.
/// Empty text yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// src/services/fetcher.rs

//! Paced page fetching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::models::{CrawlerConfig, Pacing};

/// Source of page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url`. Failures are soft and never retried here.
    async fn fetch(&self, url: &str) -> Result<String, TransportError>;
}

/// `PageFetcher` backed by a shared `reqwest` client.
pub struct HttpFetcher {
    client: Client,
    delay: Duration,
    pacing: Pacing,
    /// Start of the most recent request, for shared pacing
    last_start: Mutex<Option<Instant>>,
}

impl HttpFetcher {
    /// Wrap a client that already carries the user agent and timeout.
    pub fn new(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            delay: config.request_delay(),
            pacing: config.pacing,
            last_start: Mutex::new(None),
        }
    }

    async fn pace(&self) {
        if self.delay.is_zero() {
            return;
        }

        match self.pacing {
            Pacing::PerRequest => tokio::time::sleep(self.delay).await,
            Pacing::Shared => {
                let mut last = self.last_start.lock().await;
                let ready_at = match *last {
                    Some(prev) => prev + self.delay,
                    None => Instant::now() + self.delay,
                };
                tokio::time::sleep_until(ready_at).await;
                *last = Some(Instant::now());
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, TransportError> {
        self.pace().await;

        let result = async {
            self.client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        }
        .await;

        match result {
            Ok(body) => {
                log::debug!("Fetched {} ({} bytes)", url, body.len());
                Ok(body)
            }
            Err(e) => {
                let error = TransportError::from_reqwest(url, &e);
                match &error {
                    TransportError::Timeout { .. } => {
                        log::warn!("Timeout fetching {}", error.url())
                    }
                    _ => log::warn!("Error fetching {}: {}", url, error),
                }
                Err(error)
            }
        }
    }
}

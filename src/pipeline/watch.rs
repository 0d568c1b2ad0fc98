// src/pipeline/watch.rs

//! One watch run across all configured sites.
//!
//! Sites are checked strictly one after another. Within a site the steps are
//! fetch, extract, filter, process (concurrently) and dispatch. The dedup
//! snapshot is committed exactly once, after the last site, however many
//! sites failed on the way.

use std::sync::Arc;

use chrono::{Local, Utc};
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, RunSummary, SiteReport};
use crate::services::{
    Dispatcher, HttpFetcher, LinkExtractor, Messenger, NoticeProcessor, PageFetcher,
    TelegramMessenger,
};
use crate::storage::{SeenStorage, SeenStore};
use crate::utils::{http, site_name};

/// Drives the fetch/extract/filter/process/dispatch pipeline.
pub struct NoticeWatcher<F, M> {
    config: Arc<Config>,
    fetcher: F,
    extractor: LinkExtractor,
    dispatcher: Dispatcher<M>,
}

impl<F: PageFetcher, M: Messenger> NoticeWatcher<F, M> {
    pub fn new(config: Arc<Config>, fetcher: F, messenger: M) -> Result<Self> {
        let extractor = LinkExtractor::new(&config.extract)?;
        let dispatcher = Dispatcher::new(messenger, &config.telegram);
        Ok(Self {
            config,
            fetcher,
            extractor,
            dispatcher,
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn messenger(&self) -> &M {
        self.dispatcher.messenger()
    }

    /// Check every configured site, then persist the dedup store once.
    ///
    /// Only a failure to load the store is returned as an error; site and
    /// persistence failures are logged and reflected in the summary.
    pub async fn run(&self, storage: &dyn SeenStorage) -> Result<RunSummary> {
        let start_time = Utc::now();
        log::info!(
            "Starting watch run at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let mut seen = storage
            .load_seen(self.config.store.max_entries_per_site)
            .await?;

        let mut sites = Vec::with_capacity(self.config.sites.len());
        for url in &self.config.sites {
            let report = match self.check_site(url, &mut seen).await {
                Ok(report) => report,
                Err(e) => {
                    log::error!("Error checking {}: {}", url, e);
                    SiteReport {
                        site: site_name(url).unwrap_or_else(|| url.clone()),
                        url: url.clone(),
                        error: Some(e.to_string()),
                        ..SiteReport::default()
                    }
                }
            };
            sites.push(report);
        }

        let persisted = match storage.save_seen(&seen).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error saving seen notices: {}", e);
                false
            }
        };

        let summary = RunSummary {
            start_time,
            end_time: Utc::now(),
            total_new: sites.iter().map(|s| s.processed).sum(),
            sites,
            persisted,
        };

        log::info!(
            "Run complete. New items: {} ({} of {} sites failed)",
            summary.total_new,
            summary.failed_sites(),
            summary.sites.len()
        );
        Ok(summary)
    }

    /// Check a single listing page and report what happened.
    pub async fn check_site(&self, url: &str, seen: &mut SeenStore) -> Result<SiteReport> {
        let site = site_name(url)
            .ok_or_else(|| AppError::site(url, "cannot derive a site name from the URL"))?;
        log::info!(
            "Checking {} at {}",
            site,
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        let mut report = SiteReport {
            site: site.clone(),
            url: url.to_string(),
            ..SiteReport::default()
        };

        let base = Url::parse(url)?;
        let html = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| AppError::site(&site, e))?;

        let links = {
            let document = Html::parse_document(&html);
            self.extractor.notice_links(&document, &base)
        };
        report.discovered = links.len();
        if links.is_empty() {
            log::info!("No notice links found on {}", site);
            return Ok(report);
        }

        let new_links = seen.filter_new(&site, &links);
        report.new = new_links.len();
        if new_links.is_empty() {
            log::info!("No new notices on {}", site);
            return Ok(report);
        }
        log::info!("Found {} new notices on {}", new_links.len(), site);

        let processor = NoticeProcessor::new(&self.fetcher, &self.extractor, &self.config.crawler);
        let outcome = processor.process(&site, &new_links, seen).await;
        report.processed = outcome.notices.len();
        report.failed = outcome.failures;

        // Marks stay in place even if delivery fails below.
        let dispatch = self.dispatcher.dispatch(&outcome.messages()).await;
        report.chunks_sent = dispatch.sent;
        report.chunks_dropped = dispatch.dropped;

        Ok(report)
    }
}

/// Run one watch pass against the real network and record its statistics.
pub async fn run_watch<S: SeenStorage>(config: Arc<Config>, storage: &S) -> Result<RunSummary> {
    let client = http::create_async_client(&config.crawler)?;
    let fetcher = HttpFetcher::new(client.clone(), &config.crawler);
    let messenger = TelegramMessenger::new(client, &config.telegram);

    let watcher = NoticeWatcher::new(Arc::clone(&config), fetcher, messenger)?;
    let summary = watcher.run(storage).await?;

    if let Err(e) = storage.save_stats(&summary).await {
        log::warn!("Could not write run statistics: {}", e);
    }
    Ok(summary)
}

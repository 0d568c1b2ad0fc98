// src/services/processor.rs

//! Detail-page processing for newly discovered notices.

use futures::stream::{self, StreamExt};
use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::{CrawlerConfig, NoticeLink, ProcessedNotice};
use crate::services::{LinkExtractor, PageFetcher};
use crate::storage::SeenStore;

/// Summary of processing one site's new links.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    /// Notices in completion order
    pub notices: Vec<ProcessedNotice>,
    /// Links attempted this run
    pub attempted: usize,
    /// Links whose detail page could not be processed
    pub failures: usize,
}

impl ProcessOutcome {
    /// Display messages ready for dispatch.
    pub fn messages(&self) -> Vec<String> {
        self.notices.iter().map(|n| n.message.clone()).collect()
    }
}

/// Visits new notice links with bounded concurrency.
pub struct NoticeProcessor<'a, F> {
    fetcher: &'a F,
    extractor: &'a LinkExtractor,
    concurrency: usize,
    max_per_site: usize,
}

impl<'a, F: PageFetcher> NoticeProcessor<'a, F> {
    pub fn new(fetcher: &'a F, extractor: &'a LinkExtractor, config: &CrawlerConfig) -> Self {
        Self {
            fetcher,
            extractor,
            concurrency: config.max_concurrent.max(1),
            max_per_site: config.max_new_per_site,
        }
    }

    /// Process up to the per-site cap of `links`, marking each success seen.
    ///
    /// Links beyond the cap are left unmarked and come back next run. A link
    /// whose unit fails is also left unmarked, so it is retried next run.
    pub async fn process(
        &self,
        site: &str,
        links: &[NoticeLink],
        seen: &mut SeenStore,
    ) -> ProcessOutcome {
        let batch = &links[..links.len().min(self.max_per_site)];
        if batch.len() < links.len() {
            log::info!(
                "Processing {} of {} new notices for {}; the rest wait for the next run",
                batch.len(),
                links.len(),
                site
            );
        }

        let mut outcome = ProcessOutcome {
            attempted: batch.len(),
            ..ProcessOutcome::default()
        };

        let mut results = stream::iter(batch)
            .map(|link| async move { (link, self.process_link(site, link).await) })
            .buffer_unordered(self.concurrency);

        // Completions are applied here one at a time, so the store has a
        // single writer.
        while let Some((link, result)) = results.next().await {
            match result {
                Ok(notice) => {
                    seen.mark_seen(site, link);
                    outcome.notices.push(notice);
                }
                Err(error) => {
                    outcome.failures += 1;
                    log::warn!("Error processing {}: {}", link, error);
                }
            }
        }

        outcome
    }

    /// Fetch one detail page and turn it into a notice.
    async fn process_link(&self, site: &str, link: &str) -> Result<ProcessedNotice> {
        let html = self.fetcher.fetch(link).await?;
        let base = Url::parse(link)?;
        Ok(self.build_notice(site, link, &base, &html))
    }

    fn build_notice(&self, site: &str, link: &str, base: &Url, html: &str) -> ProcessedNotice {
        let document = Html::parse_document(html);
        let title = self.extractor.title(&document);
        let attachments = self.extractor.attachment_links(&document, base);
        ProcessedNotice::new(site, title, link, attachments)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;
    use crate::models::ExtractConfig;

    /// Serves canned pages; unknown URLs fail like a dead host.
    struct CannedFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl PageFetcher for CannedFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<String, TransportError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::Timeout {
                    url: url.to_string(),
                })
        }
    }

    /// Slow fetcher tracking how many requests overlap.
    #[derive(Default)]
    struct InFlightFetcher {
        current: AtomicUsize,
        peak: AtomicUsize,
        served: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for InFlightFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<String, TransportError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            self.served.fetch_add(1, Ordering::SeqCst);
            Ok("<h1>Notice</h1>".to_string())
        }
    }

    fn links(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://site.gov.np/notice/{i}"))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_unit_is_isolated_and_not_marked() {
        let ok = "https://site.gov.np/notice/1".to_string();
        let broken = "https://site.gov.np/notice/2".to_string();
        let fetcher = CannedFetcher {
            pages: HashMap::from([(
                ok.clone(),
                r#"<title>Exam Result</title><a href="/files/result.pdf">PDF</a>"#.to_string(),
            )]),
        };
        let extractor = LinkExtractor::new(&ExtractConfig::default()).unwrap();
        let processor = NoticeProcessor::new(&fetcher, &extractor, &CrawlerConfig::default());
        let mut seen = SeenStore::new(1000);

        let outcome = processor
            .process("site", &[ok.clone(), broken.clone()], &mut seen)
            .await;

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.notices.len(), 1);

        let notice = &outcome.notices[0];
        assert_eq!(notice.title, "Exam Result");
        assert_eq!(
            notice.attachments,
            vec!["https://site.gov.np/files/result.pdf".to_string()]
        );
        assert!(notice.message.contains("📋 Exam Result"));

        assert!(seen.contains("site", &ok));
        assert!(!seen.contains("site", &broken));
        assert_eq!(seen.entries("site").len(), 2);
    }

    #[tokio::test]
    async fn test_batch_is_capped_per_site() {
        let all = links(14);
        let fetcher = CannedFetcher {
            pages: all
                .iter()
                .map(|l| (l.clone(), "<h1>Notice</h1>".to_string()))
                .collect(),
        };
        let extractor = LinkExtractor::new(&ExtractConfig::default()).unwrap();
        let processor = NoticeProcessor::new(&fetcher, &extractor, &CrawlerConfig::default());
        let mut seen = SeenStore::new(1000);

        let outcome = processor.process("site", &all, &mut seen).await;

        assert_eq!(outcome.attempted, 10);
        assert_eq!(outcome.notices.len(), 10);
        assert_eq!(outcome.messages().len(), 10);
        // The deferred links are still new.
        assert_eq!(seen.filter_new("site", &all), all[10..].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_pages_use_fixed_pool_of_three() {
        let fetcher = InFlightFetcher::default();
        let extractor = LinkExtractor::new(&ExtractConfig::default()).unwrap();
        let processor = NoticeProcessor::new(&fetcher, &extractor, &CrawlerConfig::default());
        let mut seen = SeenStore::new(1000);

        let outcome = processor.process("site", &links(10), &mut seen).await;

        assert_eq!(outcome.notices.len(), 10);
        assert_eq!(fetcher.served.load(Ordering::SeqCst), 10);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.current.load(Ordering::SeqCst), 0);
    }
}

// src/services/extract.rs

//! Link and title extraction from parsed pages.
//!
//! Notice links are found by keyword heuristics over every anchor's href,
//! visible text and `title` attribute. Attachments are found by file
//! extension anywhere in the href, so `report.pdf?download=1` qualifies.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DEFAULT_TITLE, ExtractConfig, NoticeLink};
use crate::utils::resolve_http_url;

/// Keyword/extension based link extractor.
pub struct LinkExtractor {
    keywords: Vec<String>,
    extensions: Vec<String>,
    title_max_chars: usize,
    anchor_sel: Selector,
    /// `title`, `h1`, `h2` in fallback order
    title_sels: [Selector; 3],
}

impl LinkExtractor {
    /// Build an extractor from the extraction settings.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            keywords: lowercase_all(&config.notice_keywords),
            extensions: lowercase_all(&config.attachment_extensions),
            title_max_chars: config.title_max_chars,
            anchor_sel: Self::parse_selector("a[href]")?,
            title_sels: [
                Self::parse_selector("title")?,
                Self::parse_selector("h1")?,
                Self::parse_selector("h2")?,
            ],
        })
    }

    /// Anchors that look like notices, resolved against `base`.
    ///
    /// Order follows the page; repeats are dropped.
    pub fn notice_links(&self, document: &Html, base: &Url) -> Vec<NoticeLink> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in document.select(&self.anchor_sel) {
            let Some(href) = anchor.value().attr("href").filter(|h| !h.is_empty()) else {
                continue;
            };
            if !self.is_notice_anchor(&anchor, href) {
                continue;
            }
            if let Some(full_url) = resolve_http_url(base, href) {
                if seen.insert(full_url.clone()) {
                    links.push(full_url);
                }
            }
        }

        log::debug!("Found {} notice links on {}", links.len(), base);
        links
    }

    /// Anchors pointing at downloadable files, resolved against `base`.
    pub fn attachment_links(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        document
            .select(&self.anchor_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| {
                let href = href.to_lowercase();
                self.extensions.iter().any(|ext| href.contains(ext.as_str()))
            })
            .filter_map(|href| resolve_http_url(base, href))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Page title, falling back to the first `h1`, then `h2`, then "Notice".
    pub fn title(&self, document: &Html) -> String {
        self.title_sels
            .iter()
            .filter_map(|sel| document.select(sel).next())
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
            .map(|text| text.chars().take(self.title_max_chars).collect())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn is_notice_anchor(&self, anchor: &ElementRef, href: &str) -> bool {
        let href = href.to_lowercase();
        let text = anchor.text().collect::<String>().trim().to_lowercase();
        let title = anchor.value().attr("title").unwrap_or("").to_lowercase();

        self.keywords.iter().any(|keyword| {
            href.contains(keyword.as_str())
                || text.contains(keyword.as_str())
                || title.contains(keyword.as_str())
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

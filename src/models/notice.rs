//! Notice data structures.

use chrono::{DateTime, Utc};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};

/// Title used when a detail page carries none.
pub const DEFAULT_TITLE: &str = "Notice";

/// Absolute http(s) URL of a notice found on a listing page.
pub type NoticeLink = String;

/// A notice whose detail page was fetched and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedNotice {
    /// Site the notice was found on
    pub site: String,

    /// Extracted title, already truncated
    pub title: String,

    /// Full URL to the notice
    pub link: NoticeLink,

    /// Attachment URLs in page order
    pub attachments: Vec<String>,

    /// Display message sent to the chat
    pub message: String,
}

impl ProcessedNotice {
    pub fn new(
        site: impl Into<String>,
        title: impl Into<String>,
        link: impl Into<String>,
        attachments: Vec<String>,
    ) -> Self {
        let site = site.into();
        let title = title.into();
        let link = link.into();
        let message = format_message(&site, &title, &link, &attachments);
        Self {
            site,
            title,
            link,
            attachments,
            message,
        }
    }
}

/// Render the chat message for a notice.
///
/// The endpoint parses HTML, so every interpolated value is escaped. A title
/// equal to the default placeholder adds nothing and is left out.
pub fn format_message(site: &str, title: &str, link: &str, attachments: &[String]) -> String {
    let mut lines = vec![format!("📢 <b>{}</b>", encode_text(&site.to_uppercase()))];
    if !title.is_empty() && !title.eq_ignore_ascii_case(DEFAULT_TITLE) {
        lines.push(format!("📋 {}", encode_text(title)));
    }
    lines.push(format!("🔗 {}", encode_text(link)));
    for file in attachments {
        lines.push(format!("📄 {}", encode_text(file)));
    }
    lines.join("\n")
}

/// Outcome of checking one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteReport {
    pub site: String,
    pub url: String,
    /// Notice links on the listing page
    pub discovered: usize,
    /// Links not yet in the dedup store
    pub new: usize,
    /// Notices processed and marked seen
    pub processed: usize,
    /// Detail pages that could not be fetched
    pub failed: usize,
    pub chunks_sent: usize,
    pub chunks_dropped: usize,
    /// Set when the check was abandoned
    pub error: Option<String>,
}

/// Summary of a whole run across all sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sites: Vec<SiteReport>,
    /// Sum of processed notices over all sites
    pub total_new: usize,
    /// Whether the dedup snapshot was written
    pub persisted: bool,
}

impl RunSummary {
    pub fn failed_sites(&self) -> usize {
        self.sites.iter().filter(|s| s.error.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_full_message() {
        let notice = ProcessedNotice::new(
            "kawasotimun",
            "Vacancy for Engineers",
            "https://kawasotimun.gov.np/notice/12",
            vec!["https://kawasotimun.gov.np/files/a.pdf".to_string()],
        );
        assert_eq!(
            notice.message,
            "📢 <b>KAWASOTIMUN</b>\n📋 Vacancy for Engineers\n🔗 https://kawasotimun.gov.np/notice/12\n📄 https://kawasotimun.gov.np/files/a.pdf"
        );
    }

    #[test]
    fn test_default_title_is_omitted() {
        let message = format_message("site", "Notice", "https://site.gov.np/n/1", &[]);
        assert_eq!(message, "📢 <b>SITE</b>\n🔗 https://site.gov.np/n/1");

        let message = format_message("site", "NOTICE", "https://site.gov.np/n/1", &[]);
        assert!(!message.contains("📋"));
    }

    #[test]
    fn test_html_is_escaped() {
        let message = format_message("site", "Fees < 100 & more", "https://s.np/?a=1&b=2", &[]);
        assert!(message.contains("📋 Fees &lt; 100 &amp; more"));
        assert!(message.contains("🔗 https://s.np/?a=1&amp;b=2"));
    }
}

//! In-memory record of notices already reported, per site.
//!
//! Every site keeps an ordered list of identifiers in discovery order. A
//! notice is stored twice: as its raw URL and as a short fingerprint. Older
//! snapshots may hold either form, so lookups accept both.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

/// Hex characters kept from the fingerprint digest.
pub const FINGERPRINT_LEN: usize = 12;

/// Snapshot layout: site name to identifiers, oldest first.
pub type SeenMap = BTreeMap<String, Vec<String>>;

/// Short deterministic fingerprint of a `(url, title)` pair.
///
/// Inputs are lowercased first, so case-only differences collide on purpose.
pub fn identifier(url: &str, title: &str) -> String {
    let content = format!("{url}:{title}").to_lowercase();
    let digest = Sha256::digest(content.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Bounded per-site dedup store.
#[derive(Debug, Clone)]
pub struct SeenStore {
    sites: SeenMap,
    max_entries: usize,
}

impl SeenStore {
    /// Create an empty store keeping at most `max_entries` per site.
    pub fn new(max_entries: usize) -> Self {
        Self {
            sites: SeenMap::new(),
            max_entries,
        }
    }

    /// Adopt a loaded snapshot, dropping the oldest entries of oversized sites.
    pub fn from_map(sites: SeenMap, max_entries: usize) -> Self {
        let mut store = Self { sites, max_entries };
        let names: Vec<String> = store.sites.keys().cloned().collect();
        for name in names {
            store.trim(&name);
        }
        store
    }

    /// Links not yet reported for `site`, in candidate order.
    pub fn filter_new(&self, site: &str, candidates: &[String]) -> Vec<String> {
        let Some(seen) = self.sites.get(site) else {
            return candidates.to_vec();
        };
        candidates
            .iter()
            .filter(|link| !self.contains_entries(seen, link))
            .cloned()
            .collect()
    }

    /// Whether `link` was reported for `site`, under either identifier form.
    pub fn contains(&self, site: &str, link: &str) -> bool {
        self.sites
            .get(site)
            .is_some_and(|seen| self.contains_entries(seen, link))
    }

    /// Record `link` and its fingerprint as reported for `site`.
    pub fn mark_seen(&mut self, site: &str, link: &str) {
        let fingerprint = identifier(link, "");
        self.sites
            .entry(site.to_string())
            .or_default()
            .extend([link.to_string(), fingerprint]);
        self.trim(site);
    }

    /// Keep only the most recent entries for `site`.
    pub fn trim(&mut self, site: &str) {
        if let Some(seen) = self.sites.get_mut(site) {
            if seen.len() > self.max_entries {
                let excess = seen.len() - self.max_entries;
                seen.drain(..excess);
            }
        }
    }

    /// Identifiers stored for `site`, oldest first.
    pub fn entries(&self, site: &str) -> &[String] {
        self.sites.get(site).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The whole mapping, for persistence.
    pub fn as_map(&self) -> &SeenMap {
        &self.sites
    }

    fn contains_entries(&self, seen: &[String], link: &str) -> bool {
        let fingerprint = identifier(link, "");
        seen.iter().any(|id| id == link || *id == fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_is_deterministic_and_case_insensitive() {
        let a = identifier("https://Site.gov.np/Notice/1", "Exam Result");
        let b = identifier("https://site.gov.np/notice/1", "EXAM RESULT");
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let c = identifier("https://site.gov.np/notice/2", "Exam Result");
        assert_ne!(a, c);
    }

    #[test]
    fn test_filter_new_skips_raw_url_and_fingerprint() {
        let mut map = SeenMap::new();
        map.insert(
            "site".to_string(),
            vec![
                "https://site.gov.np/notice/1".to_string(),
                identifier("https://site.gov.np/notice/2", ""),
            ],
        );
        let store = SeenStore::from_map(map, 1000);

        let candidates = vec![
            "https://site.gov.np/notice/1".to_string(),
            "https://site.gov.np/notice/2".to_string(),
            "https://site.gov.np/notice/3".to_string(),
        ];
        assert_eq!(
            store.filter_new("site", &candidates),
            vec!["https://site.gov.np/notice/3".to_string()]
        );
        // Other sites are unaffected.
        assert_eq!(store.filter_new("other", &candidates), candidates);
    }

    #[test]
    fn test_mark_seen_stores_both_forms() {
        let mut store = SeenStore::new(1000);
        store.mark_seen("site", "https://site.gov.np/notice/9");

        assert_eq!(
            store.entries("site"),
            &[
                "https://site.gov.np/notice/9".to_string(),
                identifier("https://site.gov.np/notice/9", ""),
            ]
        );
        assert!(store.contains("site", "https://site.gov.np/notice/9"));
        assert!(
            store
                .filter_new("site", &["https://site.gov.np/notice/9".to_string()])
                .is_empty()
        );
    }

    #[test]
    fn test_mark_seen_keeps_most_recent_entries() {
        let mut store = SeenStore::new(1000);
        for i in 0..600 {
            store.mark_seen("site", &format!("https://site.gov.np/notice/{i}"));
        }

        let entries = store.entries("site");
        assert_eq!(entries.len(), 1000);
        // 1200 entries written, the first 100 notices (200 entries) dropped.
        assert_eq!(entries[0], "https://site.gov.np/notice/100");
        assert_eq!(
            entries[999],
            identifier("https://site.gov.np/notice/599", "")
        );
    }

    #[test]
    fn test_from_map_truncates_oversized_sites() {
        let mut map = SeenMap::new();
        map.insert(
            "big".to_string(),
            (0..1500).map(|i| format!("id-{i}")).collect(),
        );
        map.insert("small".to_string(), vec!["id-0".to_string()]);

        let store = SeenStore::from_map(map, 1000);
        assert_eq!(store.entries("big").len(), 1000);
        assert_eq!(store.entries("big")[0], "id-500");
        assert_eq!(store.entries("big")[999], "id-1499");
        assert_eq!(store.entries("small").len(), 1);
    }
}

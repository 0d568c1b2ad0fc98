//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative href against a base URL.
///
/// Returns `None` when the href cannot be joined or the result is not
/// http(s) (`mailto:`, `javascript:`, `tel:` and friends).
pub fn resolve_http_url(base: &Url, href: &str) -> Option<String> {
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Derive a site's short name from its listing-page URL.
///
/// The name is the first label of the host, so
/// `https://kawasotimun.gov.np/search` becomes `kawasotimun`.
pub fn site_name(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
        .and_then(|host| host.split('.').next().map(|s| s.to_string()))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_http_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_http_url(&base, "page.html"),
            Some("https://example.com/path/page.html".to_string())
        );
        assert_eq!(
            resolve_http_url(&base, "/root.html"),
            Some("https://example.com/root.html".to_string())
        );
        assert_eq!(
            resolve_http_url(&base, "http://other.com/x"),
            Some("http://other.com/x".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(resolve_http_url(&base, "mailto:info@example.com"), None);
        assert_eq!(resolve_http_url(&base, "javascript:void(0)"), None);
    }

    #[test]
    fn test_site_name() {
        assert_eq!(
            site_name("https://kawasotimun.gov.np/search/node/notice"),
            Some("kawasotimun".to_string())
        );
        assert_eq!(
            site_name("https://Madhyabindumun.gov.np:8443/en"),
            Some("madhyabindumun".to_string())
        );
        assert_eq!(site_name("not a url"), None);
    }
}

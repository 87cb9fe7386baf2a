// src/crawl/normalize.rs
// =============================================================================
// Turns any discovered URL into one canonical string.
//
// The same help-center page shows up in many spellings:
//   HTTPS://Support.Example.com/hc/en-us/articles/1-x?utm_source=mail#top
//   https://support.example.com/hc/en-us/articles/1-x/
//   https://support.example.com/hc/en-us/articles/1-x
// All of them must become the same key, otherwise the crawler would fetch
// the page three times.
//
// Rules, in order:
// 1. lower-case scheme and host
// 2. drop the query string
// 3. drop the fragment
// 4. path ends with exactly one '/'
// Path case is kept: the site treats paths as case-sensitive.
// =============================================================================

use serde::Serialize;
use std::fmt;
use url::Url;

/// A URL that went through [`normalize`]. Only this module can build one,
/// so holding a `NormalizedUrl` means the rules above were applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Parses and normalizes in one go. Returns None for strings that
    /// are not absolute URLs.
    pub fn parse(raw: &str) -> Option<Self> {
        Url::parse(raw).ok().map(|url| normalize(&url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Normalizes an already-parsed URL. Total: every Url has a normal form.
pub fn normalize(url: &Url) -> NormalizedUrl {
    let mut url = url.clone();

    // The parser lower-cases the scheme always and the host for http(s).
    // Other schemes keep their host as written, so fold it here.
    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            // set_host only fails for hosts that were valid a moment ago
            // in a different case, so ignoring the error keeps the old one
            let _ = url.set_host(Some(&lower));
        }
    }

    url.set_query(None);
    url.set_fragment(None);

    // mailto:, data: and friends have no hierarchical path to fix up
    if !url.cannot_be_a_base() {
        let path = format!("{}/", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }

    NormalizedUrl(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        NormalizedUrl::parse(raw).unwrap().to_string()
    }

    #[test]
    fn test_case_query_and_fragment_variants_collapse() {
        let a = norm("HTTP://Host.com/a?x=1#f");
        let b = norm("http://host.com/a/");
        let c = norm("http://host.com/a");
        assert_eq!(a, "http://host.com/a/");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_is_idempotent() {
        let inputs = [
            "https://Support.Convert.com/hc/en-us/articles/123-Setup?page=2#comments",
            "https://support.convert.com",
            "https://support.convert.com/hc/en-us///",
            "http://host.com:8080/A/b",
        ];
        for raw in inputs {
            let once = norm(raw);
            let twice = norm(&once);
            assert_eq!(once, twice, "not idempotent for {}", raw);
        }
    }

    #[test]
    fn test_root_gets_single_slash() {
        assert_eq!(norm("https://support.convert.com"), "https://support.convert.com/");
    }

    #[test]
    fn test_repeated_trailing_slashes_collapse() {
        assert_eq!(
            norm("https://support.convert.com/hc/en-us///"),
            "https://support.convert.com/hc/en-us/"
        );
    }

    #[test]
    fn test_path_case_is_preserved() {
        assert_eq!(
            norm("https://SUPPORT.convert.com/hc/en-us/articles/ABC-Def"),
            "https://support.convert.com/hc/en-us/articles/ABC-Def/"
        );
    }

    #[test]
    fn test_port_is_kept() {
        assert_eq!(norm("http://127.0.0.1:4000/x"), "http://127.0.0.1:4000/x/");
    }

    #[test]
    fn test_cannot_be_a_base_urls_do_not_panic() {
        assert_eq!(norm("mailto:help@example.com?subject=hi"), "mailto:help@example.com");
    }

    #[test]
    fn test_rejects_relative_strings() {
        assert!(NormalizedUrl::parse("/hc/en-us/articles/1").is_none());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = NormalizedUrl::parse("https://h.com/a").unwrap();
        let b = NormalizedUrl::parse("https://h.com/b").unwrap();
        assert!(a < b);
    }
}

// src/crawl/filter.rs
// =============================================================================
// Decides whether a (normalized) URL belongs to the crawl.
//
// A URL is in scope when all three hold:
// - it is an absolute http(s) URL whose host is exactly the target host
// - its path matches one of the content patterns (articles, sections, ...)
// - its path contains none of the excluded substrings (sign-in, search)
//
// Everything else is silently dropped. A link pointing off-site or at a
// login page is not an error, it's just not our business.
// =============================================================================

use regex::Regex;
use url::Url;

use crate::config::CrawlConfig;

#[derive(Debug, Clone)]
pub struct UrlFilter {
    target_host: String,
    content_patterns: Vec<Regex>,
    // Stored lower-case; compared against the lower-cased path
    excluded_paths: Vec<String>,
}

impl UrlFilter {
    /// Compiles the patterns. Fails only if a pattern is not a valid regex.
    pub fn new(
        target_host: &str,
        content_patterns: &[String],
        excluded_paths: &[String],
    ) -> Result<Self, regex::Error> {
        let content_patterns = content_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            target_host: target_host.to_lowercase(),
            content_patterns,
            excluded_paths: excluded_paths.iter().map(|p| p.to_lowercase()).collect(),
        })
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, regex::Error> {
        Self::new(&config.target_host, &config.content_patterns, &config.excluded_paths)
    }

    // Pure and total: unparsable input is simply out of scope
    pub fn is_in_scope(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }

        if parsed.host_str() != Some(self.target_host.as_str()) {
            return false;
        }

        let path = parsed.path();
        if !self.content_patterns.iter().any(|p| p.is_match(path)) {
            return false;
        }

        let lower_path = path.to_lowercase();
        !self.excluded_paths.iter().any(|x| lower_path.contains(x.as_str()))
    }
}

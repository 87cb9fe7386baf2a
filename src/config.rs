// src/config.rs
// =============================================================================
// Tunables for both phases.
//
// The defaults describe the help center this tool was written for. Every
// value can be overridden from the command line (see cli.rs), but nothing is
// read from files or the environment.
// =============================================================================

use std::time::Duration;

/// Browser-like identity; the help center throttles obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

pub const DEFAULT_BASE_URL: &str = "https://support.convert.com";
pub const DEFAULT_START_URL: &str = "https://support.convert.com/hc/en-us";
pub const DEFAULT_TARGET_HOST: &str = "support.convert.com";

pub const DEFAULT_URL_LIST: &str = "convert_unique_urls.txt";
pub const DEFAULT_ARTICLES_FILE: &str = "convert_articles.txt";

/// Paths under these substrings are never crawled (login pages, search results)
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/signin", "/search"];

/// Article, category and section pages: `/hc/en-us/<kind>/<slug>`
pub const DEFAULT_CONTENT_PATTERNS: &[&str] = &[r"/hc/en-us/(articles|categories|sections)/[\w-]+"];

// Settings for phase 1 (discovering URLs)
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Relative links are resolved against this URL
    pub base_url: String,
    /// First page fetched
    pub start_url: String,
    /// Only links on exactly this host are followed
    pub target_host: String,
    /// How many fetches run at the same time
    pub max_workers: usize,
    /// Hard cap on fetch attempts for the whole crawl
    pub max_pages: usize,
    /// Largest batch taken from the frontier in one step
    pub max_in_flight: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
    pub user_agent: String,
    pub excluded_paths: Vec<String>,
    pub content_patterns: Vec<String>,
    /// Print the `Crawled: N | Found: M` line while running
    pub show_progress: bool,
}

impl CrawlConfig {
    // Sets the worker count and keeps the in-flight window at twice that
    pub fn with_workers(mut self, workers: usize) -> Self {
        let workers = workers.max(1);
        self.max_workers = workers;
        self.max_in_flight = workers * 2;
        self
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            start_url: DEFAULT_START_URL.to_string(),
            target_host: DEFAULT_TARGET_HOST.to_string(),
            max_workers: 15,
            max_pages: 2000,
            max_in_flight: 30,
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            excluded_paths: DEFAULT_EXCLUDED_PATHS.iter().map(|s| s.to_string()).collect(),
            content_patterns: DEFAULT_CONTENT_PATTERNS.iter().map(|s| s.to_string()).collect(),
            show_progress: true,
        }
    }
}

// Settings for phase 2 (pulling article text)
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub max_workers: usize,
    pub request_timeout: Duration,
    /// Minimum gap between two dispatched requests
    pub request_delay: Duration,
    pub user_agent: String,
    pub show_progress: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            request_timeout: Duration::from_secs(15),
            request_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_window_tracks_workers() {
        let config = CrawlConfig::default().with_workers(4);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.max_in_flight, 8);
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        let config = CrawlConfig::default().with_workers(0);
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.max_in_flight, 2);
    }

    #[test]
    fn test_default_window_is_twice_workers() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_in_flight, config.max_workers * 2);
    }
}

// src/crawl/queue.rs
// =============================================================================
// This module implements the crawl itself: a frontier of URLs waiting to be
// fetched, worked off in bounded concurrent batches.
//
// How it works:
// 1. Seed the frontier with the normalized start URL
// 2. Take a batch of frontier URLs that were never visited, at most
//    `max_in_flight` of them and never more than the page budget has left
// 3. Fetch the batch, `max_workers` requests at a time
// 4. As each fetch completes: mark the URL visited, pull links out of the
//    page, normalize + filter them, and queue the ones we've never seen
// 5. Repeat until the frontier is empty or the page budget is spent
//
// All three sets (frontier, visited, results) live in the Scheduler and
// are only touched from the loop that consumes fetch outcomes. Fetches run
// concurrently, bookkeeping does not, so two pages linking to the same URL
// can never both enqueue it.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use super::filter::UrlFilter;
use super::normalize::{normalize, NormalizedUrl};
use crate::config::CrawlConfig;
use crate::page::{extract_links, short_reason, FetchError, FetchOutcome, Fetcher};

/// Where the crawl loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Frontier has work and the budget isn't spent
    Filling,
    /// A batch is in flight
    Draining,
    /// Nothing left to do (or not allowed to do more)
    Done,
}

/// What a finished crawl hands back
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// Every in-scope URL discovered, sorted
    pub urls: Vec<NormalizedUrl>,
    /// Fetch attempts, successful or not
    pub pages_crawled: usize,
    pub failures: usize,
    /// True when the page budget ran out while URLs were still queued
    pub hit_page_limit: bool,
    pub elapsed_secs: f64,
}

// What a worker sends back to the coordinating loop
struct Completed {
    url: NormalizedUrl,
    links: Result<HashSet<String>, FetchError>,
}

pub struct Scheduler {
    fetcher: Arc<dyn Fetcher>,
    filter: UrlFilter,
    base: Url,
    max_workers: usize,
    max_in_flight: usize,
    max_pages: usize,
    show_progress: bool,

    // Discovered, not yet dispatched
    frontier: HashSet<NormalizedUrl>,
    // Fetch attempt completed; never fetched again
    visited: HashSet<NormalizedUrl>,
    // Everything in scope we've heard of; this is what gets saved
    results: BTreeSet<NormalizedUrl>,

    pages_crawled: usize,
    failures: usize,
    state: CrawlState,
}

impl Scheduler {
    // Builds a scheduler for one crawl. Fails on a bad start/base URL
    // or an invalid content pattern, before any request is made.
    pub fn new(config: &CrawlConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| anyhow!("Invalid base URL '{}': {}", config.base_url, e))?;
        let start = Url::parse(&config.start_url)
            .map_err(|e| anyhow!("Invalid start URL '{}': {}", config.start_url, e))?;
        let filter = UrlFilter::from_config(config).context("Invalid content pattern")?;

        let start = normalize(&start);
        let mut results = BTreeSet::new();
        // The landing page is usually an index, not content; only keep it
        // in the output if it would pass the filter like any other link
        if filter.is_in_scope(start.as_str()) {
            results.insert(start.clone());
        }

        Ok(Self {
            fetcher,
            filter,
            base,
            max_workers: config.max_workers.max(1),
            max_in_flight: config.max_in_flight.max(1),
            max_pages: config.max_pages,
            show_progress: config.show_progress,
            frontier: HashSet::from([start]),
            visited: HashSet::new(),
            results,
            pages_crawled: 0,
            failures: 0,
            state: CrawlState::Filling,
        })
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    // Runs the crawl to completion
    pub async fn run(&mut self) -> CrawlReport {
        let started = Instant::now();

        while self.state != CrawlState::Done {
            let batch = self.next_batch();
            if batch.is_empty() {
                self.state = CrawlState::Done;
                break;
            }

            self.state = CrawlState::Draining;
            debug!(batch = batch.len(), frontier = self.frontier.len(), "dispatching batch");
            self.dispatch(batch).await;

            self.state = if self.budget_left() == 0 {
                CrawlState::Done
            } else {
                CrawlState::Filling
            };
        }

        if self.show_progress {
            println!();
        }

        // Only a cut-off crawl counts: budget spent with work still queued
        let hit_page_limit = self.budget_left() == 0 && !self.frontier.is_empty();
        info!(
            crawled = self.pages_crawled,
            found = self.results.len(),
            failures = self.failures,
            hit_page_limit,
            "crawl finished"
        );

        CrawlReport {
            urls: self.results.iter().cloned().collect(),
            pages_crawled: self.pages_crawled,
            failures: self.failures,
            hit_page_limit,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    fn budget_left(&self) -> usize {
        self.max_pages.saturating_sub(self.pages_crawled)
    }

    // Takes the next batch out of the frontier.
    //
    // Frontier and visited never overlap here: URLs leave the frontier when
    // dispatched and only re-enter through `record`, which checks visited.
    fn next_batch(&mut self) -> Vec<NormalizedUrl> {
        let cap = self.max_in_flight.min(self.budget_left());

        let batch: Vec<NormalizedUrl> = self
            .frontier
            .iter()
            .filter(|url| !self.visited.contains(*url))
            .take(cap)
            .cloned()
            .collect();

        for url in &batch {
            self.frontier.remove(url);
        }

        batch
    }

    // Fetches a batch with at most `max_workers` requests in flight and
    // records each outcome as soon as it arrives. Returns once every
    // request in the batch has completed.
    async fn dispatch(&mut self, batch: Vec<NormalizedUrl>) {
        let fetcher = Arc::clone(&self.fetcher);
        let base = self.base.clone();

        let mut completed = stream::iter(batch)
            .map(|url| {
                let fetcher = Arc::clone(&fetcher);
                let base = base.clone();
                async move {
                    let links = match fetcher.fetch(&url).await {
                        FetchOutcome::Success(page) => Ok(extract_links(&page.html, &base)),
                        FetchOutcome::Failure(e) => Err(e),
                    };
                    Completed { url, links }
                }
            })
            .buffer_unordered(self.max_workers);

        while let Some(done) = completed.next().await {
            self.record(done);
        }
    }

    // The single place where the three sets change
    fn record(&mut self, done: Completed) {
        let Completed { url, links } = done;

        self.visited.insert(url.clone());
        self.pages_crawled += 1;

        match links {
            Ok(links) => {
                let mut added = 0;
                for raw in links {
                    let Some(link) = NormalizedUrl::parse(&raw) else {
                        continue;
                    };
                    if !self.filter.is_in_scope(link.as_str()) {
                        continue;
                    }
                    if self.visited.contains(&link) || self.results.contains(&link) {
                        continue;
                    }
                    self.frontier.insert(link.clone());
                    self.results.insert(link);
                    added += 1;
                }
                debug!(url = %url, new_links = added, "page crawled");
            }
            Err(e) => {
                self.failures += 1;
                warn!(url = %url, error = %short_reason(&e), "fetch failed");
            }
        }

        if self.show_progress {
            print!("\rCrawled: {} | Found: {}", self.pages_crawled, self.results.len());
            let _ = std::io::stdout().flush();
        }
    }
}

// Convenience wrapper: build a scheduler and run it
pub async fn crawl_site(config: &CrawlConfig, fetcher: Arc<dyn Fetcher>) -> Result<CrawlReport> {
    let mut scheduler = Scheduler::new(config, fetcher)?;
    let report = scheduler.run().await;
    debug_assert_eq!(scheduler.state(), CrawlState::Done);
    Ok(report)
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why batches instead of one long-running worker pool?
//    - The page budget has to be exact. Sizing each batch to what the budget
//      has left means we can never overshoot, even with 50 workers.
//    - Everything in a batch finishes before the next one is picked, so a
//      crawl that reaches Done has no orphaned requests.
//
// 2. Why is `visited` marked on completion and not on dispatch?
//    - A dispatched URL is already out of the frontier and (unless it's the
//      start page) in `results`, so nothing can queue it again meanwhile.
//
// 3. Why BTreeSet for results?
//    - The output file is sorted. Keeping the set ordered gives that for free.
//
// 4. Visit order inside a batch is whatever the network gives us. Only the
//    final set of URLs is meaningful.
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::page::Page;

    const HOST: &str = "https://help.test";

    fn page_url(path: &str) -> String {
        format!("{}{}", HOST, path)
    }

    // A fake site: path -> links on that page. Paths missing from the map
    // answer with a 404. Counts every fetch.
    struct FakeSite {
        pages: HashMap<NormalizedUrl, Vec<String>>,
        failing: HashSet<NormalizedUrl>,
        calls: Mutex<HashMap<NormalizedUrl, usize>>,
    }

    impl FakeSite {
        fn new(graph: &[(&str, &[&str])]) -> Self {
            let pages = graph
                .iter()
                .map(|(path, links)| {
                    let key = NormalizedUrl::parse(&page_url(path)).unwrap();
                    (key, links.iter().map(|l| l.to_string()).collect())
                })
                .collect();
            Self {
                pages,
                failing: HashSet::new(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn failing(mut self, path: &str) -> Self {
            self.failing.insert(NormalizedUrl::parse(&page_url(path)).unwrap());
            self
        }

        fn calls_for(&self, path: &str) -> usize {
            let key = NormalizedUrl::parse(&page_url(path)).unwrap();
            *self.calls.lock().unwrap().get(&key).unwrap_or(&0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }

        fn max_calls_per_url(&self) -> usize {
            self.calls.lock().unwrap().values().copied().max().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
            *self.calls.lock().unwrap().entry(url.clone()).or_insert(0) += 1;
            // Let other fetches interleave
            tokio::task::yield_now().await;

            if self.failing.contains(url) {
                return FetchOutcome::Failure(FetchError::Status(500));
            }
            match self.pages.get(url) {
                Some(links) => {
                    let html = links
                        .iter()
                        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
                        .collect::<String>();
                    FetchOutcome::Success(Page {
                        url: url.clone(),
                        html: format!("<html><body>{}</body></html>", html),
                    })
                }
                None => FetchOutcome::Failure(FetchError::Status(404)),
            }
        }
    }

    fn config(workers: usize, max_pages: usize) -> CrawlConfig {
        CrawlConfig {
            base_url: HOST.to_string(),
            start_url: page_url("/hc/en-us/categories/1-start"),
            target_host: "help.test".to_string(),
            max_pages,
            show_progress: false,
            ..CrawlConfig::default()
        }
        .with_workers(workers)
    }

    const START: &str = "/hc/en-us/categories/1-start";
    const B: &str = "/hc/en-us/sections/2-b";
    const C: &str = "/hc/en-us/articles/3-c";
    const D: &str = "/hc/en-us/articles/4-d";
    const E: &str = "/hc/en-us/articles/5-e";

    fn small_site() -> FakeSite {
        FakeSite::new(&[
            (START, &[B, C]),
            // Variants of C must collapse into one URL
            (B, &["/hc/en-us/articles/3-c/?utm=1", "/hc/en-us/articles/4-d#intro"]),
            (C, &[START]),
            (D, &[]),
        ])
    }

    fn sorted(paths: &[&str]) -> Vec<NormalizedUrl> {
        let mut urls: Vec<_> = paths
            .iter()
            .map(|p| NormalizedUrl::parse(&page_url(p)).unwrap())
            .collect();
        urls.sort();
        urls
    }

    #[tokio::test]
    async fn test_visits_every_page_once_for_any_width() {
        for workers in [1, 2, 10] {
            let site = Arc::new(small_site());
            let mut scheduler = Scheduler::new(&config(workers, 1000), site.clone()).unwrap();
            let report = scheduler.run().await;

            assert_eq!(report.urls, sorted(&[START, B, C, D]), "workers = {}", workers);
            assert_eq!(report.pages_crawled, 4);
            assert_eq!(report.failures, 0);
            assert!(!report.hit_page_limit);
            assert_eq!(site.total_calls(), 4);
            assert_eq!(site.max_calls_per_url(), 1);
            assert_eq!(scheduler.state(), CrawlState::Done);
        }
    }

    #[tokio::test]
    async fn test_page_budget_is_exact() {
        let site = Arc::new(FakeSite::new(&[
            (START, &[B, C, D, E]),
            (B, &[]),
            (C, &[]),
            (D, &[]),
            (E, &[]),
        ]));

        let mut scheduler = Scheduler::new(&config(10, 2), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 2);
        assert_eq!(site.total_calls(), 2);
        assert_eq!(site.max_calls_per_url(), 1);
        assert!(report.hit_page_limit);
        // Everything the start page linked to is still discovered
        assert_eq!(report.urls.len(), 5);
    }

    #[tokio::test]
    async fn test_failing_page_is_tried_once() {
        let site = Arc::new(
            FakeSite::new(&[
                (START, &[B, C]),
                // Only reachable through B, which always fails
                (B, &[D]),
                (C, &[B]),
                (D, &[]),
            ])
            .failing(B),
        );

        let mut scheduler = Scheduler::new(&config(3, 1000), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(site.calls_for(B), 1);
        assert_eq!(site.calls_for(D), 0);
        assert_eq!(report.failures, 1);
        assert_eq!(report.pages_crawled, 3);
        assert_eq!(report.urls, sorted(&[START, B, C]));
    }

    #[tokio::test]
    async fn test_everything_failing_still_terminates() {
        let site = Arc::new(FakeSite::new(&[]));
        let mut scheduler = Scheduler::new(&config(4, 1000), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 1);
        assert_eq!(report.failures, 1);
        // The start page is in scope, so it's the only result
        assert_eq!(report.urls, sorted(&[START]));
    }

    #[tokio::test]
    async fn test_out_of_scope_links_are_ignored() {
        let site = Arc::new(FakeSite::new(&[
            (
                START,
                &[
                    B,
                    "https://elsewhere.test/hc/en-us/articles/9-x",
                    "/hc/en-us/signin",
                    "/hc/en-us/articles/6-f/search",
                    "/hc/en-us/requests/new",
                    "mailto:help@help.test",
                ],
            ),
            (B, &[]),
        ]));

        let mut scheduler = Scheduler::new(&config(2, 1000), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.urls, sorted(&[START, B]));
        assert_eq!(site.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_out_of_scope_start_page_is_fetched_but_not_listed() {
        let site = Arc::new(FakeSite::new(&[("/hc/en-us", &[C]), (C, &[])]));
        let cfg = CrawlConfig {
            start_url: page_url("/hc/en-us"),
            ..config(2, 1000)
        };

        let mut scheduler = Scheduler::new(&cfg, site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(site.calls_for("/hc/en-us/"), 1);
        assert_eq!(report.urls, sorted(&[C]));
        assert_eq!(report.pages_crawled, 2);
    }

    #[tokio::test]
    async fn test_same_site_gives_same_results() {
        let first = crawl_site(&config(5, 1000), Arc::new(small_site())).await.unwrap();
        let second = crawl_site(&config(5, 1000), Arc::new(small_site())).await.unwrap();
        assert_eq!(first.urls, second.urls);
    }

    // Every page links to a brand new page, forever
    struct EndlessSite {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Fetcher for EndlessSite {
        async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            FetchOutcome::Success(Page {
                url: url.clone(),
                html: format!(
                    r#"<a href="/hc/en-us/articles/{}-a">a</a><a href="/hc/en-us/articles/{}-b">b</a>"#,
                    n, n
                ),
            })
        }
    }

    #[tokio::test]
    async fn test_budget_stops_unbounded_site() {
        let site = Arc::new(EndlessSite {
            calls: Mutex::new(0),
        });
        let mut scheduler = Scheduler::new(&config(3, 25), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 25);
        assert_eq!(*site.calls.lock().unwrap(), 25);
        assert!(report.hit_page_limit);
    }

    #[tokio::test]
    async fn test_budget_equal_to_site_size_is_not_a_cutoff() {
        let site = Arc::new(FakeSite::new(&[(START, &[B]), (B, &[])]));
        let mut scheduler = Scheduler::new(&config(2, 2), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 2);
        assert_eq!(report.urls, sorted(&[START, B]));
        assert!(!report.hit_page_limit);
    }

    // Start page links to `pages` articles; each fetch sleeps a little and
    // tracks how many fetches are running at once
    struct SlowSite {
        pages: usize,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowSite {
        fn new(pages: usize) -> Self {
            Self {
                pages,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for SlowSite {
        async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let html = if url.as_str().contains("/categories/") {
                (0..self.pages)
                    .map(|i| format!(r#"<a href="/hc/en-us/articles/{}-p">p</a>"#, i))
                    .collect()
            } else {
                String::new()
            };
            FetchOutcome::Success(Page {
                url: url.clone(),
                html,
            })
        }
    }

    #[tokio::test]
    async fn test_in_flight_fetches_never_exceed_workers() {
        let site = Arc::new(SlowSite::new(60));
        let mut scheduler = Scheduler::new(&config(3, 1000), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 61);
        assert_eq!(report.urls.len(), 61);
        assert_eq!(site.peak.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_batch_is_capped_by_window_and_budget() {
        let mut scheduler = Scheduler::new(&config(3, 1000), Arc::new(small_site())).unwrap();
        for i in 0..100 {
            let url = NormalizedUrl::parse(&page_url(&format!("/hc/en-us/articles/{}-x", i))).unwrap();
            scheduler.frontier.insert(url);
        }

        let batch = scheduler.next_batch();
        assert_eq!(batch.len(), 6);
        assert!(batch.iter().all(|url| !scheduler.frontier.contains(url)));

        // 4 pages of budget left: the batch shrinks to fit
        scheduler.pages_crawled = 996;
        assert_eq!(scheduler.next_batch().len(), 4);

        scheduler.pages_crawled = 1000;
        assert!(scheduler.next_batch().is_empty());
    }

    #[tokio::test]
    async fn test_zero_budget_fetches_nothing() {
        let site = Arc::new(small_site());
        let mut scheduler = Scheduler::new(&config(2, 0), site.clone()).unwrap();
        let report = scheduler.run().await;

        assert_eq!(report.pages_crawled, 0);
        assert_eq!(site.total_calls(), 0);
        assert_eq!(scheduler.state(), CrawlState::Done);
    }

    #[tokio::test]
    async fn test_crawls_a_live_server() {
        use crate::config::DEFAULT_USER_AGENT;
        use crate::page::HttpFetcher;

        let mut server = mockito::Server::new_async().await;
        let _start = server
            .mock("GET", "/hc/en-us/")
            .with_status(200)
            .with_body(r#"<a href="/hc/en-us/articles/1-a">A</a><a href="/hc/en-us/signin">Log in</a>"#)
            .create_async()
            .await;
        let _article = server
            .mock("GET", "/hc/en-us/articles/1-a/")
            .with_status(200)
            .with_body(r#"<a href="/hc/en-us/articles/2-gone?x=1">Gone</a>"#)
            .create_async()
            .await;
        let gone = server
            .mock("GET", "/hc/en-us/articles/2-gone/")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let cfg = CrawlConfig {
            base_url: server.url(),
            start_url: format!("{}/hc/en-us", server.url()),
            target_host: "127.0.0.1".to_string(),
            max_pages: 100,
            show_progress: false,
            ..CrawlConfig::default()
        };
        let fetcher = Arc::new(HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap());

        let report = crawl_site(&cfg, fetcher).await.unwrap();

        gone.assert_async().await;
        assert_eq!(report.pages_crawled, 3);
        assert_eq!(report.failures, 1);
        let found: Vec<&str> = report.urls.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            found,
            vec![
                format!("{}/hc/en-us/articles/1-a/", server.url()),
                format!("{}/hc/en-us/articles/2-gone/", server.url()),
            ]
        );
    }

    #[test]
    fn test_bad_start_url_is_rejected() {
        let cfg = CrawlConfig {
            start_url: "not a url".to_string(),
            ..CrawlConfig::default()
        };
        assert!(Scheduler::new(&cfg, Arc::new(small_site())).is_err());
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let cfg = CrawlConfig {
            content_patterns: vec!["[".to_string()],
            ..CrawlConfig::default()
        };
        assert!(Scheduler::new(&cfg, Arc::new(small_site())).is_err());
    }
}

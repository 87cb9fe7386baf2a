// src/scrape/mod.rs
// =============================================================================
// Phase 2: turn the URL list into article text.
//
// There is no scheduling problem here. The worklist is fixed, every URL is
// fetched once, and the only knobs are how many requests run at the same
// time and how far apart they start (to stay polite with the help center).
//
// Failed fetches are logged and skipped; they produce no record.
// =============================================================================

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::crawl::NormalizedUrl;
use crate::page::{extract_content, short_reason, FetchOutcome, Fetcher, NO_CONTENT};

/// One scraped page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    /// Successfully scraped, in worklist order
    pub articles: Vec<Article>,
    pub total: usize,
    pub failures: usize,
    pub elapsed_secs: f64,
}

// Scrapes every URL in the worklist.
//
// At most `max_workers` requests are in flight, and two requests never
// start less than `request_delay` apart.
pub async fn scrape_articles(
    urls: Vec<String>,
    fetcher: Arc<dyn Fetcher>,
    config: &ScrapeConfig,
) -> ScrapeReport {
    let started = Instant::now();
    let total = urls.len();
    let delay = config.request_delay;

    // `then` holds an async block, so the stream has to be pinned to poll it
    let mut pending = Box::pin(
        stream::iter(urls.into_iter().enumerate())
            // Pacing: each URL is released `delay` after the previous one
            .then(|(i, url)| async move {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                url
            })
            .map(|url| {
                let fetcher = Arc::clone(&fetcher);
                async move { scrape_one(fetcher.as_ref(), url).await }
            })
            // `buffered` keeps the results in worklist order
            .buffered(config.max_workers.max(1)),
    );

    let mut articles = Vec::new();
    let mut done = 0;
    while let Some(article) = pending.next().await {
        done += 1;
        if let Some(article) = article {
            articles.push(article);
        }
        if config.show_progress {
            print!("\rScraped {}/{} articles", done, total);
            let _ = std::io::stdout().flush();
        }
    }
    if config.show_progress {
        println!();
    }

    let failures = total - articles.len();
    info!(scraped = articles.len(), total, failures, "scrape finished");

    ScrapeReport {
        articles,
        total,
        failures,
        elapsed_secs: started.elapsed().as_secs_f64(),
    }
}

async fn scrape_one(fetcher: &dyn Fetcher, url: String) -> Option<Article> {
    let Some(target) = NormalizedUrl::parse(&url) else {
        warn!(url = %url, "skipping line that is not a URL");
        return None;
    };

    match fetcher.fetch(&target).await {
        FetchOutcome::Success(page) => {
            let content = extract_content(&page.html);
            if content == NO_CONTENT {
                debug!(url = %page.url, "no article body on page");
            } else {
                debug!(url = %page.url, chars = content.len(), "article scraped");
            }
            // The record names the URL that was actually fetched; a line with
            // a query or fragment was fetched without it
            if target.as_str() != url {
                debug!(line = %url, fetched = %target, "worklist line was normalized");
            }
            Some(Article {
                url: target.to_string(),
                content,
            })
        }
        FetchOutcome::Failure(e) => {
            warn!(url = %url, error = %short_reason(&e), "scrape failed");
            None
        }
    }
}

// src/page/fetch.rs
// =============================================================================
// Downloads pages over HTTP.
//
// Key functionality:
// - One shared reqwest client (connection pooling) with a browser-like
//   User-Agent, because the help center rejects obvious bots
// - Per-request timeout
// - Every problem (DNS, refused connection, timeout, 404, 500...) becomes
//   FetchOutcome::Failure. Nothing is thrown at the caller.
// - No retries. A failed page is just a failed page.
//
// The crawler and the scraper only know about the `Fetcher` trait, so tests
// can plug in a fake site without touching the network.
// =============================================================================

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::crawl::NormalizedUrl;

/// A successfully downloaded page
#[derive(Debug, Clone)]
pub struct Page {
    pub url: NormalizedUrl,
    pub html: String,
}

// Why a fetch failed. Only used for diagnostics, the crawler treats
// all of them the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("could not read body: {0}")]
    Body(#[source] reqwest::Error),
}

/// The result of one fetch attempt
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Page),
    Failure(FetchError),
}

// Anything that can turn a URL into a page
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome;
}

/// The real thing: GET over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, timeout })
    }

    async fn get(&self, url: &NormalizedUrl) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.categorize(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e)
            }
        })
    }

    fn categorize(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(error)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &NormalizedUrl) -> FetchOutcome {
        match self.get(url).await {
            Ok(html) => FetchOutcome::Success(Page {
                url: url.clone(),
                html,
            }),
            Err(e) => FetchOutcome::Failure(e),
        }
    }
}

// Shortens an error message for one-line diagnostics
pub fn short_reason(error: &FetchError) -> String {
    error.to_string().chars().take(80).collect()
}

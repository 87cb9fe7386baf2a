// src/page/mod.rs
// =============================================================================
// This module deals with single pages.
//
// Submodules:
// - fetch: downloads a page (the Fetcher trait and its HTTP implementation)
// - html: pulls links and article text out of downloaded HTML
//
// Nothing in here keeps state between calls, apart from the HTTP client's
// connection pool.
// =============================================================================

mod fetch;
mod html;

pub use fetch::{short_reason, FetchError, FetchOutcome, Fetcher, HttpFetcher, Page};
pub use html::{extract_content, extract_links, NO_CONTENT};

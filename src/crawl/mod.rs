// src/crawl/mod.rs
// =============================================================================
// This module discovers every content page on the target site.
//
// Pieces:
// - normalize: one canonical spelling per URL (the dedup key)
// - filter: is this URL on our host, a content page, and not excluded?
// - queue: the frontier/scheduler that drives the concurrent crawl
//
// Only `queue` has state, and that state lives for one crawl.
// =============================================================================

mod filter;
mod normalize;
mod queue;

pub use normalize::NormalizedUrl;
pub use queue::crawl_site;

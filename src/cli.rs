// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands, one per phase:
//   crawl   discover every content URL and save the list
//   scrape  read the list back and save the article text
//
// Every tunable in config.rs has a flag here with the same default.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    CrawlConfig, ScrapeConfig, DEFAULT_ARTICLES_FILE, DEFAULT_BASE_URL, DEFAULT_START_URL,
    DEFAULT_TARGET_HOST, DEFAULT_URL_LIST, DEFAULT_USER_AGENT,
};

#[derive(Parser, Debug)]
#[command(
    name = "support-crawler",
    version,
    about = "Discover and scrape every article on a help-center site",
    long_about = "support-crawler walks a help-center site, collects the canonical URL of every \
                  article, section and category page, and can then download the text of each one."
)]
pub struct Cli {
    /// Show debug logs (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the site and write the sorted list of content URLs
    ///
    /// Example: support-crawler crawl --max-pages 500
    Crawl(CrawlArgs),

    /// Fetch every URL from the list and write the article text
    ///
    /// Example: support-crawler scrape --input convert_unique_urls.txt
    Scrape(ScrapeArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// First page to fetch
    #[arg(long, default_value = DEFAULT_START_URL)]
    pub start_url: String,

    /// Relative links are resolved against this URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Only links on exactly this host are followed
    #[arg(long, default_value = DEFAULT_TARGET_HOST)]
    pub host: String,

    /// Concurrent requests
    #[arg(long, default_value_t = 15)]
    pub max_workers: usize,

    /// Stop after this many fetch attempts
    #[arg(long, default_value_t = 2000)]
    pub max_pages: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Skip URLs whose path contains this (repeatable; replaces the defaults)
    #[arg(long = "exclude")]
    pub excluded_paths: Vec<String>,

    /// Only follow paths matching this regex (repeatable; replaces the defaults)
    #[arg(long = "pattern")]
    pub content_patterns: Vec<String>,

    /// Where to write the URL list
    #[arg(long, short, default_value = DEFAULT_URL_LIST)]
    pub output: PathBuf,

    /// Print the final report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl CrawlArgs {
    pub fn to_config(&self) -> CrawlConfig {
        let defaults = CrawlConfig::default();
        CrawlConfig {
            base_url: self.base_url.clone(),
            start_url: self.start_url.clone(),
            target_host: self.host.clone(),
            max_pages: self.max_pages,
            request_timeout: Duration::from_secs(self.timeout_secs),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            excluded_paths: or_default(&self.excluded_paths, defaults.excluded_paths.clone()),
            content_patterns: or_default(&self.content_patterns, defaults.content_patterns.clone()),
            show_progress: !self.json,
            ..defaults
        }
        .with_workers(self.max_workers)
    }
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// URL list written by `crawl`
    #[arg(long, short, default_value = DEFAULT_URL_LIST)]
    pub input: PathBuf,

    /// Where to write the articles
    #[arg(long, short, default_value = DEFAULT_ARTICLES_FILE)]
    pub output: PathBuf,

    /// Concurrent requests
    #[arg(long, default_value_t = 10)]
    pub max_workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Minimum gap between two requests, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Print the final report as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

impl ScrapeArgs {
    pub fn to_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            max_workers: self.max_workers.max(1),
            request_timeout: Duration::from_secs(self.timeout_secs),
            request_delay: Duration::from_millis(self.delay_ms),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            show_progress: !self.json,
        }
    }
}

fn or_default(given: &[String], default: Vec<String>) -> Vec<String> {
    if given.is_empty() {
        default
    } else {
        given.to_vec()
    }
}

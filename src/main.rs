// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr)
// 3. Dispatch to the crawl or scrape handler
// 4. Print a summary (or JSON) and exit with a proper code
//    (0 = success, 1 = finished but produced nothing, 2 = error)
// =============================================================================

mod cli;      // src/cli.rs - command-line parsing
mod config;   // src/config.rs - tunables and their defaults
mod crawl;    // src/crawl/ - URL normalization, filtering, the crawl loop
mod output;   // src/output.rs - URL list and article files
mod page;     // src/page/ - fetching pages, pulling links and text out
mod scrape;   // src/scrape/ - phase 2, article text

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, CrawlArgs, ScrapeArgs};
use page::HttpFetcher;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise -v means debug and the default is info
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("support_crawler={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Crawl(args) => handle_crawl(&args).await,
        Commands::Scrape(args) => handle_scrape(&args).await,
    }
}

// Phase 1: crawl and save the URL list
async fn handle_crawl(args: &CrawlArgs) -> Result<i32> {
    let config = args.to_config();

    if !args.json {
        println!("🚀 Crawling {}", config.start_url);
        println!(
            "📊 {} workers, up to {} pages",
            config.max_workers, config.max_pages
        );
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent, config.request_timeout)?);
    let report = crawl::crawl_site(&config, fetcher).await?;

    // Always write, even an empty list
    output::write_url_list(&args.output, &report.urls)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "✅ Saved {} URLs to {} in {:.2} seconds",
            report.urls.len(),
            args.output.display(),
            report.elapsed_secs
        );
        println!("📊 Summary:");
        println!("   📄 Pages crawled: {}", report.pages_crawled);
        println!("   ❌ Failed: {}", report.failures);
        if report.hit_page_limit {
            println!("   ⚠️  Stopped at the page limit ({})", config.max_pages);
        }
    }

    Ok(if report.urls.is_empty() { 1 } else { 0 })
}

// Phase 2: scrape every URL in the list and save the articles
async fn handle_scrape(args: &ScrapeArgs) -> Result<i32> {
    let config = args.to_config();
    let urls = output::read_url_list(&args.input)?;

    if !args.json {
        println!("🔍 Found {} URLs to scrape", urls.len());
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent, config.request_timeout)?);
    let report = scrape::scrape_articles(urls, fetcher, &config).await;

    output::write_articles(&args.output, &report.articles)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "✅ Saved {} articles to {} in {:.2} seconds",
            report.articles.len(),
            args.output.display(),
            report.elapsed_secs
        );
        println!("📊 Summary:");
        println!("   📄 Scraped: {}/{}", report.articles.len(), report.total);
        println!("   ❌ Failed: {}", report.failures);
    }

    Ok(if report.articles.is_empty() { 1 } else { 0 })
}

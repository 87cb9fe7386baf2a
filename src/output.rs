// src/output.rs
// =============================================================================
// Reading and writing the two text artifacts.
//
// Phase 1 writes the URL list: one normalized URL per line, sorted,
// every line newline-terminated, no header.
//
// Phase 2 reads that list back (blank lines skipped) and writes one record
// per scraped article:
//
//   URL: <url>
//
//   Content:
//   <text>
//
//   ========...  (80 '=')
// =============================================================================

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::crawl::NormalizedUrl;
use crate::scrape::Article;

const SEPARATOR_WIDTH: usize = 80;

pub fn write_url_list(path: &Path, urls: &[NormalizedUrl]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    for url in urls {
        writeln!(out, "{}", url)?;
    }

    out.flush()
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(())
}

// Reads the worklist for phase 2. Lines are trimmed; blank ones are skipped.
pub fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Could not read URL list {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn format_article(article: &Article) -> String {
    format!(
        "\nURL: {}\n\nContent:\n{}\n\n{}\n",
        article.url,
        article.content,
        "=".repeat(SEPARATOR_WIDTH)
    )
}

pub fn write_articles(path: &Path, articles: &[Article]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Could not create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    for article in articles {
        out.write_all(format_article(article).as_bytes())?;
    }

    out.flush()
        .with_context(|| format!("Could not write {}", path.display()))?;
    Ok(())
}

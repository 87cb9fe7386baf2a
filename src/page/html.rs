// src/page/html.rs
// =============================================================================
// Everything we pull out of a page's HTML.
//
// - extract_links: every <a href> on the page, made absolute
// - extract_content: the readable text of the article body
//
// Both are best effort. html5ever (under `scraper`) never refuses a document,
// it just builds the best tree it can, so broken markup gives us fewer links
// or less text, never an error.
// =============================================================================

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Shown in place of the text when a page has no article body
pub const NO_CONTENT: &str = "No content found";

// Subtrees whose text is never part of the article
const SKIPPED_TAGS: &[&str] = &["script", "style", "nav", "footer", "aside"];

fn link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // Constant selector, known to be valid
    SELECTOR.get_or_init(|| Selector::parse("a[href]").unwrap())
}

fn div_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("div[class]").unwrap())
}

fn body_class() -> &'static Regex {
    static CLASS: OnceLock<Regex> = OnceLock::new();
    CLASS.get_or_init(|| Regex::new("article-body|content").unwrap())
}

// Extracts all http(s) links from HTML content
//
// Relative hrefs are resolved against `base` (the site root for a crawl),
// not against the page they came from.
//
// Returns absolute URL strings, not yet normalized or filtered.
pub fn extract_links(html: &str, base: &Url) -> HashSet<String> {
    let document = Html::parse_document(html);

    document
        .select(link_selector())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(base, href))
        .collect()
}

// Resolves a link (possibly relative) to an absolute http(s) URL
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // join() handles both absolute and relative hrefs
    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        // mailto:, tel:, javascript: ...
        _ => None,
    }
}

// Pulls the main text block out of an article page.
//
// The first <div> with a class matching `article-body|content` is the
// article. Text inside script/style/nav/footer/aside is dropped, then all
// whitespace runs collapse to one space.
pub fn extract_content(html: &str) -> String {
    let document = Html::parse_document(html);

    let body = document.select(div_selector()).find(|div| {
        div.value()
            .classes()
            .any(|class| body_class().is_match(class))
    });

    match body {
        Some(div) => clean_text(&visible_text(div)),
        None => NO_CONTENT.to_string(),
    }
}

// Concatenates the element's text nodes, skipping unwanted subtrees
fn visible_text(root: ElementRef<'_>) -> String {
    let mut text = String::new();

    for node in root.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        // Only look inside the article; what wraps it doesn't matter
        let skipped = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root.id())
            .any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
            });

        if !skipped {
            text.push_str(fragment);
        }
    }

    text
}

/// Collapses whitespace runs into single spaces and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

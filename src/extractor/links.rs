//! Link discovery
//!
//! Links are taken from the whole raw page, not just the article container,
//! so navigation menus still lead the crawler to sibling pages.
//!
//! **Include:** `<a href>` anywhere and `<link rel="canonical">`.
//!
//! **Exclude:** `download` anchors, fragment-only anchors, and
//! `javascript:`, `mailto:`, `tel:` and `data:` targets.

use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href]").expect("BUG: hardcoded CSS selector 'a[href]' is invalid")
});

static CANONICAL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("link[rel='canonical'][href]")
        .expect("BUG: hardcoded CSS selector for canonical links is invalid")
});

static BASE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("base[href]").expect("BUG: hardcoded CSS selector 'base[href]' is invalid")
});

/// Absolute http(s) links found in the document, deduplicated in page order
///
/// # Arguments
///
/// * `document` - Parsed page
/// * `page_url` - URL the page was fetched from; `<base href>` overrides it
pub(crate) fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let base = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let anchors = document
        .select(&ANCHOR_SELECTOR)
        .filter(|el| el.value().attr("download").is_none())
        .filter_map(|el| el.value().attr("href"));
    let canonical = document
        .select(&CANONICAL_SELECTOR)
        .filter_map(|el| el.value().attr("href"));

    let mut seen = HashSet::new();
    anchors
        .chain(canonical)
        .filter_map(|href| resolve_link(href, &base))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None for excluded schemes, fragment-only links, and anything that
/// is not http(s) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);
    Some(absolute.to_string())
}

use crate::extractor::render::{collapse_spaces, is_noise};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1").expect("BUG: hardcoded CSS selector 'h1' is invalid")
});

static H2_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2").expect("BUG: hardcoded CSS selector 'h2' is invalid")
});

static SOCIAL_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:title'], meta[name='twitter:title']")
        .expect("BUG: hardcoded CSS selector for social title meta is invalid")
});

const MAX_SENTENCE_TITLE_CHARS: usize = 120;

/// Derives a non-empty title
///
/// Fallback order: `<title>`, first `<h1>`, social-meta title, first `<h2>`,
/// first sentence of the extracted body, and finally the URL itself.
pub(crate) fn extract_title(document: &Html, content: &str, url: &Url) -> String {
    let from_title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| clean(&el.text().collect::<String>()));

    from_title
        .filter(|t| !t.is_empty())
        .or_else(|| heading(document, &H1_SELECTOR))
        .or_else(|| social_title(document))
        .or_else(|| heading(document, &H2_SELECTOR))
        .or_else(|| first_sentence(content))
        .unwrap_or_else(|| url.as_str().to_string())
}

fn heading(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter(|el| !within_noise(el))
        .map(|el| clean(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn social_title(document: &Html) -> Option<String> {
    document
        .select(&SOCIAL_TITLE_SELECTOR)
        .filter_map(|el| el.value().attr("content"))
        .map(clean)
        .find(|t| !t.is_empty())
}

fn within_noise(element: &ElementRef) -> bool {
    is_noise(element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_noise(&ancestor))
}

fn clean(raw: &str) -> String {
    collapse_spaces(raw)
        .trim_end_matches(|c: char| c == '¶' || c == '#' || c.is_whitespace())
        .trim_end_matches("[edit]")
        .trim()
        .to_string()
}

/// First sentence of the body, skipping code fences and list markers
pub(crate) fn first_sentence(content: &str) -> Option<String> {
    let mut in_fence = false;
    let line = content.lines().find(|line| {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            return false;
        }
        !in_fence && !trimmed.is_empty()
    })?;

    let line = line.trim().trim_start_matches("- ").trim();
    let sentence = match line.find(['.', '!', '?']) {
        Some(end) if end > 0 => &line[..end],
        _ => line,
    };

    let mut title: String = sentence.chars().take(MAX_SENTENCE_TITLE_CHARS).collect();
    if sentence.chars().count() > MAX_SENTENCE_TITLE_CHARS {
        if let Some(cut) = title.rfind(' ') {
            title.truncate(cut);
        }
    }

    let title = title.trim().to_string();
    (!title.is_empty()).then_some(title)
}

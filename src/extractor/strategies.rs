//! Container selection per content type
//!
//! Each known type names the elements that hold its article body. When none
//! match, the generic strategy scores candidate containers by text density
//! and keeps the tightest one that carries most of the best score.

use crate::extractor::render::{is_noise, MAX_NESTING_DEPTH};
use crate::extractor::ContentType;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("BUG: hardcoded selector '{css}' is invalid: {e:?}"))
}

static REFERENCE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "div.body[role='main']",
        "div[role='main']",
        "article.main-page-content",
        "#main-content",
        "div.document",
        "main",
        "article",
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static ENCYCLOPEDIA_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "#mw-content-text .mw-parser-output",
        "#mw-content-text",
        "#bodyContent",
        "main",
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static FORGE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["article.markdown-body", ".markdown-body", "#readme", "body"]
        .into_iter()
        .map(selector)
        .collect()
});

static MAN_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["#manpage", ".manual-text", "#content", "main", "body"]
        .into_iter()
        .map(selector)
        .collect()
});

/// Question plus every answer body, in page order
static QA_POSTS: LazyLock<Selector> = LazyLock::new(|| {
    selector("#question .s-prose, #question .post-text, .answer .s-prose, .answer .post-text")
});

static QA_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("#question-header h1"));

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("body"));

const CANDIDATE_TAGS: &[&str] = &["main", "article", "section", "div", "td"];

const SEMANTIC_TAGS: &[&str] = &["main", "article"];

/// Fraction of the best score a nested candidate needs to replace its ancestor
const DESCEND_RATIO: f64 = 0.85;

/// Containers chosen by the strategy for `content_type`
///
/// Returns an empty list when the type-specific selectors find nothing, so
/// the caller can fall back to [`select_generic`].
pub(crate) fn select_for_type<'a>(document: &'a Html, content_type: ContentType) -> Vec<ElementRef<'a>> {
    match content_type {
        ContentType::ReferenceDoc => first_match(document, &REFERENCE_SELECTORS),
        ContentType::Encyclopedia => first_match(document, &ENCYCLOPEDIA_SELECTORS),
        ContentType::ForgeMarkdown => first_match(document, &FORGE_SELECTORS),
        ContentType::ManPage => first_match(document, &MAN_SELECTORS),
        ContentType::QaExport => {
            let mut posts: Vec<ElementRef> = document.select(&QA_TITLE).take(1).collect();
            posts.extend(document.select(&QA_POSTS));
            if posts.len() <= 1 {
                Vec::new()
            } else {
                posts
            }
        }
        ContentType::Generic => Vec::new(),
    }
}

fn first_match<'a>(document: &'a Html, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|sel| document.select(sel).next())
        .into_iter()
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct Density {
    text_len: usize,
    link_text_len: usize,
    paragraphs: usize,
}

impl Density {
    fn add(&mut self, other: Density) {
        self.text_len += other.text_len;
        self.link_text_len += other.link_text_len;
        self.paragraphs += other.paragraphs;
    }

    fn link_density(&self) -> f64 {
        if self.text_len == 0 {
            return 1.0;
        }
        self.link_text_len as f64 / self.text_len as f64
    }
}

struct Candidate<'a> {
    element: ElementRef<'a>,
    depth: usize,
    score: f64,
}

/// Picks the densest content container in the document
///
/// Scores are `text * (1 - link density) + 30 * paragraphs`, with a bonus for
/// `<main>`/`<article>`. Because an ancestor always accumulates its
/// children's text, the winner is then narrowed to the deepest descendant
/// that still holds at least 85% of the best score.
pub(crate) fn select_generic(document: &Html) -> Option<ElementRef<'_>> {
    let body = document.select(&BODY_SELECTOR).next()?;

    let mut candidates = Vec::new();
    measure(body, 0, false, &mut candidates);

    let best = candidates
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;
    if best.score <= 0.0 {
        return Some(body);
    }

    let threshold = best.score * DESCEND_RATIO;
    let best_id = best.element.id();
    let narrowed = candidates
        .iter()
        .filter(|c| c.score >= threshold)
        .filter(|c| c.element.id() == best_id || c.element.ancestors().any(|a| a.id() == best_id))
        .max_by_key(|c| c.depth)
        .map(|c| c.element);

    narrowed.or(Some(best.element))
}

fn measure<'a>(
    element: ElementRef<'a>,
    depth: usize,
    inside_link: bool,
    candidates: &mut Vec<Candidate<'a>>,
) -> Density {
    let mut density = Density::default();
    if depth > MAX_NESTING_DEPTH {
        return density;
    }

    let name = element.value().name();
    let is_link = inside_link || name == "a";
    if matches!(name, "p" | "pre" | "li" | "blockquote") {
        density.paragraphs += 1;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let len = text.trim().chars().count();
                density.text_len += len;
                if is_link {
                    density.link_text_len += len;
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_noise(&child) {
                        density.add(measure(child, depth + 1, is_link, candidates));
                    }
                }
            }
            _ => {}
        }
    }

    if CANDIDATE_TAGS.contains(&name) || element.value().attr("role") == Some("main") {
        let mut score = density.text_len as f64 * (1.0 - density.link_density())
            + 30.0 * density.paragraphs as f64;
        if SEMANTIC_TAGS.contains(&name)
            || element.value().attr("role") == Some("main")
            || element.value().attr("itemprop") == Some("articleBody")
        {
            score *= 1.2;
        }
        candidates.push(Candidate {
            element,
            depth,
            score,
        });
    }

    density
}

/// The document body, or the root element when there is none
pub(crate) fn body_or_root(document: &Html) -> ElementRef<'_> {
    document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element())
}

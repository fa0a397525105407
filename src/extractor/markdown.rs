//! Markdown sources are rendered to HTML first so headings, lists and code
//! blocks go through the same text renderer as crawled pages.

use crate::extractor::ContentType;
use pulldown_cmark::{html, Options, Parser};

/// Renders Markdown into a standalone HTML document
pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, parser);

    format!("<html><head></head><body>{}</body></html>", body)
}

/// Whether a body should go through the Markdown renderer
///
/// The response MIME type wins when it names a document type. Forge files
/// served without one are Markdown; anything else is sniffed.
pub(crate) fn is_markdown_source(body: &str, mime: &str, content_type: ContentType) -> bool {
    let mime = mime
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "text/markdown" | "text/x-markdown" | "text/plain" => true,
        "text/html" | "application/xhtml+xml" => false,
        _ if content_type == ContentType::ForgeMarkdown => true,
        _ => !looks_like_markup(body),
    }
}

/// Heuristic: a body that does not open with markup is treated as Markdown
/// or plain text
pub(crate) fn looks_like_markup(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(1024).collect();
    let lower = head.to_ascii_lowercase();
    lower.starts_with('<')
        && (lower.contains("<html")
            || lower.contains("<!doctype")
            || lower.contains("<body")
            || lower.contains("<head")
            || lower.contains("<div")
            || lower.contains("<p"))
}

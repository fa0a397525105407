//! Content extraction module
//!
//! Turns a fetched page into a title, cleaned body text, an excerpt, a
//! content-type classification, a quality verdict and the page's outgoing
//! links. Extraction is a pure transformation and never fails: malformed
//! input degrades to generic extraction, and input that yields nothing comes
//! back with a failed verdict.

mod content_type;
mod excerpt;
mod links;
mod markdown;
mod quality;
mod render;
mod strategies;
mod title;

pub use content_type::ContentType;
pub use excerpt::make_excerpt;
pub(crate) use excerpt::strip_code;
pub use quality::{assess, quality_score, QualityVerdict, RejectReason};
pub use render::normalize_whitespace;

use crate::config::ExtractionConfig;
use render::RenderOptions;
use scraper::Html;
use url::Url;

/// Maximum raw page size accepted for extraction (10 MB)
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

/// Everything the crawler needs from one page
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub content_type: ContentType,
    pub verdict: QualityVerdict,
    pub quality_score: f64,
    pub links: Vec<String>,
}

/// Stateless extractor configured with the quality thresholds
#[derive(Debug, Clone)]
pub struct Extractor {
    min_content_length: usize,
    excerpt_length: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl Extractor {
    pub fn new(min_content_length: usize, excerpt_length: usize) -> Self {
        Self {
            min_content_length,
            excerpt_length,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.min_content_length, config.excerpt_length)
    }

    /// Extracts content from a raw page body
    ///
    /// # Arguments
    ///
    /// * `raw` - Page body as fetched (HTML, Markdown, or plain text)
    /// * `url` - Final URL of the page, used for type detection and links
    pub fn extract(&self, raw: &str, url: &Url) -> ExtractedContent {
        self.extract_with_mime(raw, url, "")
    }

    /// Extracts content using the response's Content-Type as a hint
    ///
    /// Markdown and plain-text responses are always rendered as Markdown, so
    /// a README that opens with an HTML banner keeps its headings and code
    /// blocks. An empty `mime` falls back to sniffing the body.
    pub fn extract_with_mime(&self, raw: &str, url: &Url, mime: &str) -> ExtractedContent {
        let content_type = ContentType::detect(url);

        if raw.trim().is_empty() || raw.len() > MAX_HTML_SIZE {
            tracing::debug!("Unparseable body for {} ({} bytes)", url, raw.len());
            return self.parse_failed(url, content_type);
        }

        let document = if markdown::is_markdown_source(raw, mime, content_type) {
            Html::parse_document(&markdown::markdown_to_html(raw))
        } else {
            Html::parse_document(raw)
        };

        let links = links::extract_links(&document, url);

        let options = RenderOptions {
            fence_code: content_type.fences_code(),
            stop_sections: content_type.stop_sections(),
        };

        let mut content = {
            let containers = strategies::select_for_type(&document, content_type);
            if containers.is_empty() {
                String::new()
            } else {
                render::render_containers(&containers, options)
            }
        };

        if content.is_empty() {
            if content_type != ContentType::Generic {
                tracing::debug!("{} strategy found nothing on {}; using generic", content_type, url);
            }
            let container = strategies::select_generic(&document)
                .unwrap_or_else(|| strategies::body_or_root(&document));
            content = render::render_containers(&[container], options);
        }

        let title = title::extract_title(&document, &content, url);
        let excerpt = make_excerpt(&content, self.excerpt_length);
        let verdict = assess(&title, &content, self.min_content_length);
        let quality_score = quality_score(&verdict, &content);

        ExtractedContent {
            title,
            content,
            excerpt,
            content_type,
            verdict,
            quality_score,
            links,
        }
    }

    fn parse_failed(&self, url: &Url, content_type: ContentType) -> ExtractedContent {
        ExtractedContent {
            title: url.as_str().to_string(),
            content: String::new(),
            excerpt: String::new(),
            content_type,
            verdict: QualityVerdict::Fail(RejectReason::ParseFailed),
            quality_score: 0.0,
            links: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph() -> String {
        "A file system controls how data is stored and retrieved on a storage device. ".repeat(6)
    }

    fn extractor() -> Extractor {
        Extractor::new(200, 200)
    }

    #[test]
    fn test_generic_page() {
        let html = format!(
            r#"<html><head><title>File systems</title></head><body>
                <nav><a href="/">Home</a><a href="/about">About</a></nav>
                <div class="post"><p>{p}</p><p>{p}</p></div>
                <footer>Copyright 2024</footer>
            </body></html>"#,
            p = paragraph()
        );
        let url = Url::parse("https://blog.example.org/fs").unwrap();
        let out = extractor().extract(&html, &url);

        assert_eq!(out.title, "File systems");
        assert_eq!(out.content_type, ContentType::Generic);
        assert!(out.verdict.is_pass());
        assert!(!out.content.contains("Copyright"));
        assert!(!out.content.contains("About"));
        assert!(out.excerpt.chars().count() <= 201);
        assert!(out.quality_score > 0.0);
        assert_eq!(
            out.links,
            vec!["https://blog.example.org/", "https://blog.example.org/about"]
        );
    }

    #[test]
    fn test_encyclopedia_strategy_and_stop_section() {
        let html = format!(
            r#"<html><head><title>Inode - Wikipedia</title></head><body>
                <div id="mw-content-text"><div class="mw-parser-output">
                    <table class="infobox"><tr><td>Infobox junk</td></tr></table>
                    <p>{p}</p>
                    <h2>See also</h2><ul><li>Other article</li></ul>
                </div></div>
            </body></html>"#,
            p = paragraph()
        );
        let url = Url::parse("https://en.wikipedia.org/wiki/Inode").unwrap();
        let out = extractor().extract(&html, &url);

        assert_eq!(out.content_type, ContentType::Encyclopedia);
        assert!(out.verdict.is_pass());
        assert!(!out.content.contains("Infobox junk"));
        assert!(!out.content.contains("Other article"));
    }

    #[test]
    fn test_markdown_source() {
        let markdown = format!(
            "# Tokio Guide\n\n{}\n\n```rust\n#[tokio::main]\nasync fn main() {{}}\n```\n\n- first\n- second\n",
            paragraph()
        );
        let url =
            Url::parse("https://raw.githubusercontent.com/tokio-rs/tokio/master/README.md").unwrap();
        let out = extractor().extract(&markdown, &url);

        assert_eq!(out.content_type, ContentType::ForgeMarkdown);
        assert_eq!(out.title, "Tokio Guide");
        assert!(out.content.contains("```rust\n#[tokio::main]\nasync fn main() {}\n```"));
        assert!(out.content.contains("- first\n- second"));
        assert!(!out.excerpt.contains("tokio::main"));
    }

    #[test]
    fn test_markdown_with_html_banner() {
        let readme = format!(
            "<p align=\"center\">\n  <img src=\"logo.png\" alt=\"Widget\">\n</p>\n\n\
             # Installing Widget\n\n{}\n\n\
             ```rust\nfn main() {{\n    println!(\"hello\");\n}}\n```\n\n\
             More text follows the example.\n",
            paragraph()
        );
        let url =
            Url::parse("https://raw.githubusercontent.com/acme/widget/main/README.md").unwrap();

        for mime in ["text/plain; charset=utf-8", ""] {
            let out = extractor().extract_with_mime(&readme, &url, mime);
            assert_eq!(out.content_type, ContentType::ForgeMarkdown);
            assert_eq!(out.title, "Installing Widget");
            assert!(out.verdict.is_pass());
            assert!(
                out.content
                    .contains("```rust\nfn main() {\n    println!(\"hello\");\n}\n```"),
                "code block lost its lines for mime {:?}: {}",
                mime,
                out.content
            );
            assert!(out.content.lines().count() > 5);
        }
    }

    #[test]
    fn test_html_mime_is_not_rendered_as_markdown() {
        let page = format!(
            "<div class=\"post\"><h1>Release notes</h1><p>{}</p></div>",
            paragraph()
        );
        let url = Url::parse("https://github.com/acme/widget/blob/main/NOTES.md").unwrap();
        let out = extractor().extract_with_mime(&page, &url, "text/html; charset=utf-8");
        assert_eq!(out.title, "Release notes");
        assert!(!out.content.contains("<p>"));
    }

    #[test]
    fn test_short_page_fails_quality() {
        let html = "<html><head><title>Tiny</title></head><body><p>Too short.</p></body></html>";
        let url = Url::parse("https://blog.example.org/tiny").unwrap();
        let out = extractor().extract(html, &url);
        assert!(matches!(
            out.verdict,
            QualityVerdict::Fail(RejectReason::TooShort { .. })
        ));
        assert_eq!(out.quality_score, 0.0);
    }

    #[test]
    fn test_empty_body_parse_failed() {
        let url = Url::parse("https://blog.example.org/empty").unwrap();
        let out = extractor().extract("   ", &url);
        assert_eq!(out.verdict, QualityVerdict::Fail(RejectReason::ParseFailed));
        assert_eq!(out.title, "https://blog.example.org/empty");
    }

    #[test]
    fn test_malformed_html_degrades() {
        let html = format!("<html><body><div><p>{}<div><span>unclosed", paragraph());
        let url = Url::parse("https://docs.python.org/3/x.html").unwrap();
        let out = extractor().extract(&html, &url);
        assert!(out.verdict.is_pass());
        assert!(!out.title.is_empty());
    }
}

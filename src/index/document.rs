use crate::extractor::{make_excerpt, ContentType, ExtractedContent};
use crate::url::extract_host;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// The unit of indexing
///
/// Only pages that passed the quality gate become documents; identity is the
/// canonical URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Canonical URL (unique key)
    pub url: String,

    /// Derived title, never empty
    pub title: String,

    /// Cleaned body text with code fences preserved
    pub content: String,

    /// Short summary without code
    pub excerpt: String,

    /// Hostname used for domain filtering
    pub domain: String,

    pub content_type: ContentType,

    /// Quality score in `[0, 1]`
    pub quality_score: f64,

    /// BFS distance from a seed
    pub depth: u32,

    pub crawled_at: DateTime<Utc>,
}

impl Document {
    /// Builds a document from extractor output
    ///
    /// Returns None when the page failed the quality gate, so a rejected page
    /// can never reach the index.
    pub fn from_extracted(
        url: &Url,
        extracted: ExtractedContent,
        depth: u32,
        crawled_at: DateTime<Utc>,
    ) -> Option<Self> {
        if !extracted.verdict.is_pass() {
            return None;
        }

        let domain = extract_host(url)?;
        let title = if extracted.title.trim().is_empty() {
            url.as_str().to_string()
        } else {
            extracted.title
        };

        Some(Self {
            url: url.as_str().to_string(),
            title,
            content: extracted.content,
            excerpt: extracted.excerpt,
            domain,
            content_type: extracted.content_type,
            quality_score: extracted.quality_score,
            depth,
            crawled_at,
        })
    }

    /// Builds a generic document directly from text
    ///
    /// Used when importing pre-extracted content and in tests.
    pub fn from_text(url: &Url, title: &str, content: &str) -> Option<Self> {
        let domain = extract_host(url)?;
        let title = title.trim();
        Some(Self {
            url: url.as_str().to_string(),
            title: if title.is_empty() {
                url.as_str().to_string()
            } else {
                title.to_string()
            },
            content: content.to_string(),
            excerpt: make_excerpt(content, 200),
            domain,
            content_type: ContentType::detect(url),
            quality_score: 1.0,
            depth: 0,
            crawled_at: Utc::now(),
        })
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Known content shapes, each with its own extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    /// Anything without a dedicated strategy
    Generic,
    /// API and language reference sites (Sphinx, MDN, rustdoc, Read the Docs)
    ReferenceDoc,
    /// MediaWiki encyclopedias
    Encyclopedia,
    /// Markdown files served by a code forge
    ForgeMarkdown,
    /// Question and answer pages
    QaExport,
    /// Unix manual pages
    ManPage,
}

const REFERENCE_HOSTS: &[&str] = &[
    "docs.python.org",
    "developer.mozilla.org",
    "docs.rs",
    "doc.rust-lang.org",
    "readthedocs.io",
    "readthedocs.org",
    "docs.oracle.com",
    "pkg.go.dev",
    "nodejs.org",
    "en.cppreference.com",
];

const ENCYCLOPEDIA_HOSTS: &[&str] = &["wikipedia.org", "wikibooks.org", "wiktionary.org"];

const FORGE_HOSTS: &[&str] = &[
    "raw.githubusercontent.com",
    "github.com",
    "gitlab.com",
    "codeberg.org",
];

const QA_HOSTS: &[&str] = &[
    "stackoverflow.com",
    "stackexchange.com",
    "superuser.com",
    "serverfault.com",
    "askubuntu.com",
];

const MAN_HOSTS: &[&str] = &["man7.org", "manpages.debian.org", "linux.die.net", "man.openbsd.org"];

impl ContentType {
    /// Classifies a page by domain and path pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift::ContentType;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://en.wikipedia.org/wiki/Rust").unwrap();
    /// assert_eq!(ContentType::detect(&url), ContentType::Encyclopedia);
    /// ```
    pub fn detect(url: &Url) -> Self {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let path = url.path().to_ascii_lowercase();

        let on = |hosts: &[&str]| {
            hosts
                .iter()
                .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
        };

        if on(FORGE_HOSTS) {
            if host == "raw.githubusercontent.com" || is_markdown_path(&path) {
                return Self::ForgeMarkdown;
            }
            return Self::Generic;
        }
        if on(ENCYCLOPEDIA_HOSTS) {
            return Self::Encyclopedia;
        }
        if on(QA_HOSTS) {
            return Self::QaExport;
        }
        if on(MAN_HOSTS) || path.starts_with("/man/") || path.contains("/man-pages/") {
            return Self::ManPage;
        }
        if on(REFERENCE_HOSTS) || host.starts_with("docs.") {
            return Self::ReferenceDoc;
        }
        if is_markdown_path(&path) {
            return Self::ForgeMarkdown;
        }

        Self::Generic
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::ReferenceDoc => "reference-doc",
            Self::Encyclopedia => "encyclopedia",
            Self::ForgeMarkdown => "forge-markdown",
            Self::QaExport => "qa-export",
            Self::ManPage => "man-page",
        }
    }

    /// Section headings after which the rest of the page is dropped
    pub fn stop_sections(&self) -> &'static [&'static str] {
        match self {
            Self::Encyclopedia => &[
                "see also",
                "references",
                "external links",
                "further reading",
                "notes",
                "citations",
                "bibliography",
                "sources",
            ],
            Self::ReferenceDoc | Self::Generic => &[
                "see also",
                "references",
                "external links",
                "further reading",
                "browser compatibility",
            ],
            Self::ForgeMarkdown | Self::QaExport | Self::ManPage => &[],
        }
    }

    /// Whether `<pre>` blocks become fenced code
    ///
    /// Manual pages are preformatted throughout, so fencing them would
    /// wrap the whole document.
    pub fn fences_code(&self) -> bool {
        !matches!(self, Self::ManPage)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn is_markdown_path(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    path.ends_with(".md") || path.ends_with(".markdown") || path.ends_with(".mdx")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(url: &str) -> ContentType {
        ContentType::detect(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_reference_docs() {
        assert_eq!(detect("https://docs.python.org/3/library/os.html"), ContentType::ReferenceDoc);
        assert_eq!(
            detect("https://developer.mozilla.org/en-US/docs/Web/API/fetch"),
            ContentType::ReferenceDoc
        );
        assert_eq!(detect("https://tokio.readthedocs.io/en/latest/"), ContentType::ReferenceDoc);
        assert_eq!(detect("https://docs.example.com/guide"), ContentType::ReferenceDoc);
    }

    #[test]
    fn test_encyclopedia() {
        assert_eq!(detect("https://en.wikipedia.org/wiki/BM25"), ContentType::Encyclopedia);
    }

    #[test]
    fn test_forge_markdown() {
        assert_eq!(
            detect("https://raw.githubusercontent.com/rust-lang/rust/master/README.md"),
            ContentType::ForgeMarkdown
        );
        assert_eq!(
            detect("https://github.com/tokio-rs/tokio/blob/master/CONTRIBUTING.md"),
            ContentType::ForgeMarkdown
        );
        assert_eq!(detect("https://github.com/tokio-rs/tokio"), ContentType::Generic);
    }

    #[test]
    fn test_qa_and_man() {
        assert_eq!(
            detect("https://stackoverflow.com/questions/1/how-to"),
            ContentType::QaExport
        );
        assert_eq!(
            detect("https://unix.stackexchange.com/questions/2/x"),
            ContentType::QaExport
        );
        assert_eq!(
            detect("https://man7.org/linux/man-pages/man2/open.2.html"),
            ContentType::ManPage
        );
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(detect("https://blog.example.org/post"), ContentType::Generic);
        assert_eq!(detect("http://127.0.0.1:8080/page"), ContentType::Generic);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ContentType::ReferenceDoc).unwrap();
        assert_eq!(json, "\"reference-doc\"");
        assert_eq!(ContentType::ManPage.to_string(), "man-page");
    }
}

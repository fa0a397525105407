//! Boilerplate-aware text rendering
//!
//! Walks a container element and produces plain text: block elements become
//! paragraphs, list items become `- ` lines, `<pre>` becomes fenced code and
//! inline code keeps its backticks. Navigation, sidebars, banners and similar
//! chrome are skipped while walking, so the source tree is never mutated.

use scraper::{ElementRef, Node};

/// Maximum element nesting the renderer descends into
pub(crate) const MAX_NESTING_DEPTH: usize = 100;

const NOISE_TAGS: &[&str] = &[
    "nav", "footer", "header", "aside", "script", "style", "noscript", "form", "iframe", "svg",
    "button", "template", "select", "input", "textarea", "canvas", "object", "embed", "dialog",
    "menu", "link", "meta", "head",
];

const NOISE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "search",
    "menu",
    "menubar",
    "dialog",
];

const NOISE_TOKENS: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "menu",
    "sidebar",
    "footer",
    "header",
    "breadcrumb",
    "breadcrumbs",
    "toc",
    "table-of-contents",
    "cookie",
    "banner",
    "ad",
    "ads",
    "advertisement",
    "sponsored",
    "promo",
    "share",
    "social",
    "comments",
    "related",
    "newsletter",
    "skip-link",
    "headerlink",
    "sphinxsidebar",
    "navbox",
    "infobox",
    "vertical-navbox",
    "metadata",
    "mw-editsection",
    "mw-jump-link",
    "hatnote",
    "catlinks",
    "printfooter",
    "noprint",
    "reflist",
    "post-menu",
    "votecell",
    "js-vote-count",
    "user-info",
    "post-signature",
    "document-toc-container",
    "prev-next",
    "bc-data",
];

const NOISE_PREFIXES: &[&str] = &[
    "nav-", "navbar-", "sidebar", "cookie", "advert", "banner-", "breadcrumb", "social-",
    "share-", "toc-",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "blockquote", "ul", "ol", "dl", "dt", "dd",
    "table", "thead", "tbody", "tfoot", "figure", "figcaption", "details", "summary", "address",
    "body", "html", "center",
];

/// Rendering switches chosen per content type
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderOptions {
    pub fence_code: bool,
    pub stop_sections: &'static [&'static str],
}

/// Whether an element is page chrome rather than content
pub(crate) fn is_noise(element: &ElementRef) -> bool {
    let value = element.value();
    let name = value.name();

    if NOISE_TAGS.contains(&name) {
        return true;
    }

    // Wikipedia citation markers; Sphinx uses the same class for ordinary links
    if name == "sup" && value.classes().any(|c| c == "reference") {
        return true;
    }

    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }

    if let Some(role) = value.attr("role") {
        if NOISE_ROLES.contains(&role.to_ascii_lowercase().as_str()) {
            return true;
        }
    }

    if value.id().is_some_and(is_noise_token) {
        return true;
    }

    value.classes().any(is_noise_token)
}

fn is_noise_token(token: &str) -> bool {
    let token = token.to_ascii_lowercase();
    NOISE_TOKENS.contains(&token.as_str()) || NOISE_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Renders one or more containers into normalized text
pub(crate) fn render_containers(containers: &[ElementRef], options: RenderOptions) -> String {
    let mut renderer = TextRenderer {
        options,
        out: String::new(),
        stopped: false,
    };

    for container in containers {
        if renderer.stopped {
            break;
        }
        renderer.block_break();
        renderer.walk(*container, 0);
        renderer.block_break();
    }

    normalize_whitespace(&renderer.out)
}

struct TextRenderer {
    options: RenderOptions,
    out: String,
    stopped: bool,
}

impl TextRenderer {
    fn walk(&mut self, element: ElementRef, depth: usize) {
        if depth > MAX_NESTING_DEPTH {
            tracing::debug!(
                element = element.value().name(),
                "Nesting depth exceeded; truncating branch"
            );
            return;
        }

        for child in element.children() {
            if self.stopped {
                return;
            }
            match child.value() {
                Node::Text(text) => self.push_inline(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef, depth: usize) {
        if is_noise(&element) {
            return;
        }

        let name = element.value().name();
        match name {
            "br" => self.out.push('\n'),
            "hr" => self.block_break(),
            "img" | "picture" | "video" | "audio" | "source" => {}
            "pre" => self.code_block(element),
            "code" | "kbd" | "samp" | "tt" => self.inline_code(element),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let heading = heading_text(element);
                if matches!(name, "h2" | "h3") && self.is_stop_heading(&heading) {
                    self.stopped = true;
                    return;
                }
                self.block_break();
                self.walk(element, depth);
                self.block_break();
            }
            "li" => {
                self.line_break();
                self.out.push_str("- ");
                self.walk(element, depth);
                self.line_break();
            }
            "tr" => {
                self.line_break();
                self.walk(element, depth);
                self.line_break();
            }
            "td" | "th" => {
                self.walk(element, depth);
                self.out.push(' ');
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.block_break();
                self.walk(element, depth);
                self.block_break();
            }
            _ => self.walk(element, depth),
        }
    }

    fn push_inline(&mut self, text: &str) {
        let mut last_space = self.out.ends_with(char::is_whitespace);
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !last_space {
                    self.out.push(' ');
                    last_space = true;
                }
            } else {
                self.out.push(ch);
                last_space = false;
            }
        }
    }

    fn inline_code(&mut self, element: ElementRef) {
        let code = collapse_spaces(&element.text().collect::<String>());
        if code.is_empty() {
            return;
        }
        if !self.out.ends_with(char::is_whitespace) && !self.out.ends_with('(') {
            self.out.push(' ');
        }
        self.out.push('`');
        self.out.push_str(&code);
        self.out.push('`');
    }

    fn code_block(&mut self, element: ElementRef) {
        let code: String = element.text().collect();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return;
        }

        self.block_break();
        if self.options.fence_code {
            self.out.push_str("```");
            if let Some(lang) = code_language(element) {
                self.out.push_str(&lang);
            }
            self.out.push('\n');
            self.out.push_str(code);
            self.out.push_str("\n```");
        } else {
            self.out.push_str(code);
        }
        self.block_break();
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push_str("\n\n");
        }
    }

    fn is_stop_heading(&self, heading: &str) -> bool {
        !heading.is_empty() && self.options.stop_sections.contains(&heading)
    }
}

/// Lowercased heading text with edit links and anchor glyphs removed
fn heading_text(element: ElementRef) -> String {
    let text = collapse_spaces(&element.text().collect::<String>()).to_lowercase();
    text.trim_end_matches("[edit]")
        .trim_end_matches(|c: char| c == '¶' || c == '#' || c == ':' || c.is_whitespace())
        .trim()
        .to_string()
}

fn code_language(pre: ElementRef) -> Option<String> {
    let from_classes = |element: ElementRef| {
        element.value().classes().find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-'))
                .map(str::to_string)
        })
    };

    from_classes(pre).or_else(|| {
        pre.children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "code")
            .and_then(from_classes)
    })
}

/// Collapses every whitespace run to a single space
pub(crate) fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses whitespace outside code fences
///
/// Lines are trimmed and internal runs collapsed; consecutive blank lines
/// become one. Lines inside ``` fences are kept verbatim apart from trailing
/// whitespace.
pub fn normalize_whitespace(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut blank_pending = false;

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            if !in_fence && blank_pending {
                lines.push(String::new());
            }
            blank_pending = false;
            lines.push(trimmed.to_string());
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            lines.push(line.trim_end().to_string());
            continue;
        }

        let collapsed = collapse_spaces(trimmed);
        if collapsed.is_empty() {
            blank_pending = !lines.is_empty();
            continue;
        }
        if blank_pending {
            lines.push(String::new());
            blank_pending = false;
        }
        lines.push(collapsed);
    }

    if in_fence {
        lines.push("```".to_string());
    }

    lines.join("\n").trim().to_string()
}

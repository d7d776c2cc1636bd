//! HTML-structure-agnostic article extraction.
//!
//! Body strategies are tried in priority order and the first one that yields
//! acceptable text wins. Container selectors come first; paragraph
//! concatenation is the always-last fallback. If nothing qualifies the page
//! has no extractable content.

mod container;
mod paragraphs;

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use blogsmith_shared::{BlogsmithError, Result, SourceDocument};

pub use container::ContainerStrategy;
pub use paragraphs::ParagraphStrategy;

/// Title used when the page has neither an `<h1>` nor a `<title>`.
pub const PLACEHOLDER_TITLE: &str = "Article";

/// Container text must be longer than this to be accepted.
pub const MIN_CONTAINER_CHARS: usize = 200;

/// Individual paragraphs at or below this length are ignored by the fallback.
pub const MIN_PARAGRAPH_CHARS: usize = 20;

/// The concatenated paragraph fallback must reach this length.
pub const MIN_FALLBACK_CHARS: usize = 100;

/// Subtrees whose text never counts as article content.
const STRIPPED_TAGS: &[&str] = &["script", "style", "nav", "header", "footer", "noscript"];

/// Elements that start a new line in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4",
    "h5", "h6", "blockquote", "pre", "table", "tr", "figure", "figcaption",
];

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One way of locating the article body in a parsed document.
pub trait BodyStrategy: Send + Sync {
    /// Return the body text if this strategy finds an acceptable one.
    fn extract_body(&self, doc: &Html) -> Option<String>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extracts title, body and author from arbitrary HTML.
pub struct ContentExtractor {
    strategies: Vec<Box<dyn BodyStrategy>>,
    default_author: String,
}

impl ContentExtractor {
    /// Create an extractor with the built-in strategies
    /// (`article`, `.post-content`, `.entry-content`, `main`, then paragraphs).
    pub fn new(default_author: impl Into<String>) -> Self {
        Self {
            strategies: vec![
                Box::new(ContainerStrategy::new("article")),
                Box::new(ContainerStrategy::new(".post-content")),
                Box::new(ContainerStrategy::new(".entry-content")),
                Box::new(ContainerStrategy::new("main")),
                Box::new(ParagraphStrategy::default()),
            ],
            default_author: default_author.into(),
        }
    }

    /// Names of the strategies in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract a [`SourceDocument`] from raw HTML fetched from `source_url`.
    pub fn extract(&self, html: &str, source_url: &str) -> Result<SourceDocument> {
        let doc = Html::parse_document(html);

        let (strategy, body) = self
            .strategies
            .iter()
            .find_map(|s| s.extract_body(&doc).map(|body| (s.name(), body)))
            .ok_or_else(|| {
                BlogsmithError::extraction(format!("{source_url}: no article body found"))
            })?;

        tracing::debug!(url = source_url, strategy, chars = body.chars().count(), "body extracted");

        let title = extract_title(&doc);
        let author = extract_author(&doc).unwrap_or_else(|| self.default_author.clone());

        Ok(SourceDocument::new(&title, &body, source_url, &author, Utc::now()))
    }
}

// ---------------------------------------------------------------------------
// Title and author
// ---------------------------------------------------------------------------

/// First non-empty `<h1>`, else `<title>`, else [`PLACEHOLDER_TITLE`].
pub fn extract_title(doc: &Html) -> String {
    first_text(doc, "h1")
        .or_else(|| first_text(doc, "title"))
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string())
}

/// `.author` element text, else `<meta name="author">`.
pub fn extract_author(doc: &Html) -> Option<String> {
    first_text(doc, ".author").or_else(|| {
        let sel = Selector::parse(r#"meta[name="author"]"#).ok()?;
        doc.select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .map(single_line)
            .find(|s| !s.is_empty())
    })
}

/// Text of the first element matching `selector`, if non-empty.
fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let text = single_line(&el.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Visible text of an element with script/style/nav/header/footer subtrees removed.
pub(crate) fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    normalize_whitespace(&out)
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if STRIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse every whitespace run, newlines included, to one space.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse inline whitespace, trim lines, and squeeze blank-line runs.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    static INLINE_WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let collapsed = INLINE_WS_RE.replace_all(text, " ");
    let lines = collapsed.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_RUN_RE.replace_all(&lines, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://blog.example.com/blog/post-1";

    fn long_text(sentence: &str, n: usize) -> String {
        vec![sentence; n].join(" ")
    }

    #[test]
    fn extracts_from_article_container() {
        let body = long_text("Chatbots answer customer questions around the clock.", 8);
        let html = format!(
            r#"<html><head><title>Tab Title</title><meta name="author" content="Meta Author"></head>
            <body><nav>Home | Blog | Contact</nav>
            <article><h1>Real Title</h1><script>var x = 1;</script><p>{body}</p>
            <footer>Copyright 2024</footer></article></body></html>"#
        );

        let doc = ContentExtractor::new("Fallback").extract(&html, URL).unwrap();
        assert_eq!(doc.title, "Real Title");
        assert_eq!(doc.author, "Meta Author");
        assert!(doc.body.contains("Chatbots answer customer questions"));
        assert!(!doc.body.contains("var x"));
        assert!(!doc.body.contains("Copyright"));
        assert_eq!(doc.source_url, URL);
        assert_eq!(doc.word_count, doc.body.split_whitespace().count());
    }

    #[test]
    fn short_container_falls_through_to_next_selector() {
        let body = long_text("Support automation improves response times a lot.", 8);
        let html = format!(
            r#"<html><body><article>Too short.</article>
            <div class="entry-content"><p>{body}</p></div></body></html>"#
        );

        let doc = ContentExtractor::new("Fallback").extract(&html, URL).unwrap();
        assert!(doc.body.starts_with("Support automation"));
        assert!(!doc.body.contains("Too short"));
    }

    #[test]
    fn falls_back_to_paragraphs_without_containers() {
        let html = r#"<html><body>
            <div><p>This paragraph is long enough to be kept by the fallback.</p></div>
            <p>tiny</p>
            <p>Another sufficiently long paragraph sits right here in the page.</p>
        </body></html>"#;

        let doc = ContentExtractor::new("Fallback").extract(html, URL).unwrap();
        assert_eq!(
            doc.body,
            "This paragraph is long enough to be kept by the fallback.\n\n\
             Another sufficiently long paragraph sits right here in the page."
        );
        assert_eq!(doc.title, PLACEHOLDER_TITLE);
        assert_eq!(doc.author, "Fallback");
    }

    #[test]
    fn fails_when_fallback_is_too_short() {
        let html = r#"<html><body><p>Only one modest paragraph here.</p><p>x</p></body></html>"#;
        let err = ContentExtractor::new("Fallback").extract(html, URL).unwrap_err();
        assert!(matches!(err, BlogsmithError::Extraction { .. }));
    }

    #[test]
    fn title_prefers_h1_then_title_element() {
        let doc = Html::parse_document("<html><head><title> Page </title></head><body></body></html>");
        assert_eq!(extract_title(&doc), "Page");

        let doc = Html::parse_document("<html><body><h1>  </h1></body></html>");
        assert_eq!(extract_title(&doc), PLACEHOLDER_TITLE);
    }

    #[test]
    fn author_prefers_labeled_element() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="author" content="Meta"></head>
            <body><span class="author"> Jane Doe </span></body></html>"#,
        );
        assert_eq!(extract_author(&doc).as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn multi_line_title_and_author_collapse_to_one_line() {
        let body = long_text("Chatbots answer customer questions around the clock.", 8);
        let html = format!(
            "<html><body><h1>\n  Why Chatbots\n  Matter\n</h1>\
             <span class=\"author\">Jane\n   Doe</span>\
             <article><p>{body}</p></article></body></html>"
        );

        let doc = ContentExtractor::new("Fallback").extract(&html, URL).unwrap();
        assert_eq!(doc.title, "Why Chatbots Matter");
        assert_eq!(doc.author, "Jane Doe");
        assert!(!doc.body.contains("Why Chatbots"));
    }

    #[test]
    fn normalize_whitespace_keeps_paragraph_breaks() {
        let text = "  one   two \n\n\n\n three\t\tfour  ";
        assert_eq!(normalize_whitespace(text), "one two\n\nthree four");
    }

    #[test]
    fn strategy_order_is_stable() {
        let extractor = ContentExtractor::new("x");
        assert_eq!(
            extractor.strategy_names(),
            vec!["article", ".post-content", ".entry-content", "main", "paragraphs"]
        );
    }
}

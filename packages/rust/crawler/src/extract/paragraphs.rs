//! Paragraph concatenation fallback.

use scraper::{Html, Selector};

use super::{BodyStrategy, MIN_FALLBACK_CHARS, MIN_PARAGRAPH_CHARS, visible_text};

/// Joins every `<p>` longer than the paragraph floor with blank lines.
pub struct ParagraphStrategy {
    min_paragraph_chars: usize,
    min_total_chars: usize,
}

impl Default for ParagraphStrategy {
    fn default() -> Self {
        Self {
            min_paragraph_chars: MIN_PARAGRAPH_CHARS,
            min_total_chars: MIN_FALLBACK_CHARS,
        }
    }
}

impl BodyStrategy for ParagraphStrategy {
    fn extract_body(&self, doc: &Html) -> Option<String> {
        let sel = Selector::parse("p").ok()?;
        let body = doc
            .select(&sel)
            .map(visible_text)
            .filter(|text| text.chars().count() > self.min_paragraph_chars)
            .collect::<Vec<_>>()
            .join("\n\n");

        (body.chars().count() >= self.min_total_chars).then_some(body)
    }

    fn name(&self) -> &str {
        "paragraphs"
    }
}

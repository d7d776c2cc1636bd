//! Structural container strategy (`article`, `.post-content`, `main`, ...).

use scraper::{Html, Selector};

use super::{BodyStrategy, MIN_CONTAINER_CHARS, visible_text};

/// Accepts the first element matching `selector` whose visible text is
/// longer than the minimum container length.
pub struct ContainerStrategy {
    selector: &'static str,
    min_chars: usize,
}

impl ContainerStrategy {
    pub fn new(selector: &'static str) -> Self {
        Self {
            selector,
            min_chars: MIN_CONTAINER_CHARS,
        }
    }
}

impl BodyStrategy for ContainerStrategy {
    fn extract_body(&self, doc: &Html) -> Option<String> {
        let sel = Selector::parse(self.selector).ok()?;
        doc.select(&sel)
            .map(visible_text)
            .find(|text| text.chars().count() > self.min_chars)
    }

    fn name(&self) -> &str {
        self.selector
    }
}

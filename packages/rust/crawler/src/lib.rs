//! Blog crawling and article extraction.
//!
//! This crate provides:
//! - [`extract`]: ordered body strategies and the [`ContentExtractor`]
//! - [`engine`]: the sequential, rate-paced [`SiteCrawler`]

pub mod engine;
pub mod extract;

pub use engine::{CrawlResult, SiteCrawler, USER_AGENT, discover_links, placeholder_documents};
pub use extract::{
    BodyStrategy, ContainerStrategy, ContentExtractor, ParagraphStrategy, extract_author,
    extract_title,
};

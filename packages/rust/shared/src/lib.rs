//! Shared types, error model, and configuration for Blogsmith.
//!
//! This crate is the foundation depended on by all other Blogsmith crates.
//! It provides:
//! - [`BlogsmithError`]: the unified error type
//! - Domain types ([`SourceDocument`], [`ReferenceDocument`], [`EnhancedDocument`], [`ArticleRecord`])
//! - Configuration ([`AppConfig`] and the runtime option structs)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, GenerationConfig, GenerationOptions, PipelineConfig, PipelineOptions,
    SearchConfig, SearchOptions, SiteConfig, StorageConfig, config_dir, config_file_path,
    database_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{BlogsmithError, Result};
pub use types::{
    ArticleId, ArticleRecord, DERIVED_TITLE_SUFFIX, DERIVED_URL_SUFFIX, EXCERPT_CHARS,
    EnhancedDocument, GenerationMeta, GenerationMethod, MAX_AUTHOR_CHARS, MAX_BODY_CHARS,
    MAX_TITLE_CHARS, ReferenceDocument, SourceDocument, derived_source_url, truncate_chars,
    word_count,
};

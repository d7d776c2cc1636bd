//! Error types for Blogsmith.
//!
//! Library crates use [`BlogsmithError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Most variants are recovered locally by the pipeline: an extraction failure
//! becomes placeholder content, a search failure becomes an empty reference
//! list, a generation failure becomes rule-based synthesis. Only storage errors
//! are surfaced per article.

use std::path::PathBuf;

/// Top-level error type for all Blogsmith operations.
#[derive(Debug, thiserror::Error)]
pub enum BlogsmithError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error (connect failure, timeout, non-success status).
    #[error("network error: {0}")]
    Network(String),

    /// No usable article content could be found in a document.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// Search results page could not be fetched or parsed.
    #[error("search error: {0}")]
    Search(String),

    /// External generative model call failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, malformed record, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlogsmithError>;

impl BlogsmithError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

//! Core domain types: source articles, references, and enhanced rewrites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 300;

/// Maximum body length in characters.
pub const MAX_BODY_CHARS: usize = 10_000;

/// Maximum author length in characters.
pub const MAX_AUTHOR_CHARS: usize = 100;

/// Excerpt length in characters (taken from the start of the body).
pub const EXCERPT_CHARS: usize = 200;

/// Suffix appended to an original's source URL to mark a derived record.
pub const DERIVED_URL_SUFFIX: &str = "-enhanced";

/// Suffix appended to an original's title for a derived record.
pub const DERIVED_TITLE_SUFFIX: &str = " (Enhanced)";

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for persisted article identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    /// Generate a new time-sortable article identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Take at most `max_chars` characters from `text` (char-boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Naive whitespace-delimited word count.
///
/// Undercounts scripts that do not separate words with whitespace.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

// ---------------------------------------------------------------------------
// SourceDocument
// ---------------------------------------------------------------------------

/// An article captured from the primary site. Identity is `source_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub source_url: String,
    pub author: String,
    pub fetched_at: DateTime<Utc>,
    pub word_count: usize,
}

impl SourceDocument {
    /// Build a document, applying the field length limits and deriving
    /// the excerpt and word count from the (truncated) body.
    pub fn new(
        title: &str,
        body: &str,
        source_url: impl Into<String>,
        author: &str,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let body = truncate_chars(body, MAX_BODY_CHARS);
        Self {
            title: truncate_chars(title, MAX_TITLE_CHARS),
            excerpt: truncate_chars(&body, EXCERPT_CHARS),
            word_count: word_count(&body),
            body,
            source_url: source_url.into(),
            author: truncate_chars(author, MAX_AUTHOR_CHARS),
            fetched_at,
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceDocument
// ---------------------------------------------------------------------------

/// External supporting material for one enhancement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub title: String,
    pub source_url: String,
    /// Leading slice of the reference body, bounded by the pipeline.
    pub excerpt_body: String,
    pub fetched_at: DateTime<Utc>,
}

impl ReferenceDocument {
    /// Trim a scraped document down to a reference of at most `max_chars` body characters.
    pub fn from_source(doc: &SourceDocument, max_chars: usize) -> Self {
        Self {
            title: doc.title.clone(),
            source_url: doc.source_url.clone(),
            excerpt_body: truncate_chars(&doc.body, max_chars),
            fetched_at: doc.fetched_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Generation metadata
// ---------------------------------------------------------------------------

/// Which synthesis tier produced an enhanced body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationMethod {
    #[serde(rename = "external-model")]
    ExternalModel,
    #[serde(rename = "rule-based")]
    RuleBased,
}

impl GenerationMethod {
    /// Tag stored alongside derived records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalModel => "external-model",
            Self::RuleBased => "rule-based",
        }
    }
}

impl std::fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenerationMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "external-model" => Ok(Self::ExternalModel),
            "rule-based" => Ok(Self::RuleBased),
            other => Err(format!("unknown generation method: {other}")),
        }
    }
}

/// How and when a derived body was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub method: GenerationMethod,
    /// Model identifier, only set for external generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub word_count: usize,
}

// ---------------------------------------------------------------------------
// EnhancedDocument
// ---------------------------------------------------------------------------

/// A synthesized rewrite of exactly one original article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDocument {
    /// Lookup-only back-reference to the original record.
    pub original_id: ArticleId,
    pub original_url: String,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub author: String,
    pub references: Vec<ReferenceDocument>,
    pub generation: GenerationMeta,
}

impl EnhancedDocument {
    /// Source URL of the derived record for a given version (1-based).
    pub fn source_url_for_version(&self, version: u32) -> String {
        derived_source_url(&self.original_url, version)
    }
}

/// `<original>-enhanced` for the first version, `<original>-enhanced-v<n>` after.
pub fn derived_source_url(original_url: &str, version: u32) -> String {
    if version <= 1 {
        format!("{original_url}{DERIVED_URL_SUFFIX}")
    } else {
        format!("{original_url}{DERIVED_URL_SUFFIX}-v{version}")
    }
}

// ---------------------------------------------------------------------------
// ArticleRecord
// ---------------------------------------------------------------------------

/// A persisted article row, original or derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub source_url: String,
    pub author: String,
    pub is_derived: bool,
    /// Set only on derived records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<ArticleId>,
    /// Derived version number (0 for originals).
    pub version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationMeta>,
    pub word_count: usize,
    pub fetched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// View an original record as the synthesizer's input document.
    pub fn to_source_document(&self) -> SourceDocument {
        SourceDocument {
            title: self.title.clone(),
            body: self.body.clone(),
            excerpt: self.excerpt.clone(),
            source_url: self.source_url.clone(),
            author: self.author.clone(),
            fetched_at: self.fetched_at,
            word_count: self.word_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_roundtrip() {
        let id = ArticleId::new();
        let parsed: ArticleId = id.to_string().parse().expect("parse ArticleId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count("one  two\nthree\tfour"), 4);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn source_document_applies_limits() {
        let body = "word ".repeat(3_000);
        let doc = SourceDocument::new(
            &"T".repeat(400),
            &body,
            "https://example.com/blog/a",
            &"A".repeat(150),
            Utc::now(),
        );
        assert_eq!(doc.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(doc.body.chars().count(), MAX_BODY_CHARS);
        assert_eq!(doc.author.chars().count(), MAX_AUTHOR_CHARS);
        assert_eq!(doc.excerpt.chars().count(), EXCERPT_CHARS);
        assert!(doc.body.starts_with(&doc.excerpt));
        assert_eq!(doc.word_count, 2_000);
    }

    #[test]
    fn reference_from_source_bounds_body() {
        let doc = SourceDocument::new("Ref", &"x".repeat(5_000), "https://r.example/a", "me", Utc::now());
        let reference = ReferenceDocument::from_source(&doc, 2_000);
        assert_eq!(reference.excerpt_body.len(), 2_000);
        assert_eq!(reference.source_url, "https://r.example/a");
    }

    #[test]
    fn generation_method_tags() {
        assert_eq!(GenerationMethod::RuleBased.as_str(), "rule-based");
        assert_eq!(GenerationMethod::ExternalModel.to_string(), "external-model");
        assert_eq!(
            "rule-based".parse::<GenerationMethod>(),
            Ok(GenerationMethod::RuleBased)
        );
        let json = serde_json::to_string(&GenerationMethod::ExternalModel).unwrap();
        assert_eq!(json, r#""external-model""#);
    }

    #[test]
    fn derived_urls_are_versioned() {
        let url = "https://example.com/blog/post";
        assert_eq!(derived_source_url(url, 1), "https://example.com/blog/post-enhanced");
        assert_eq!(derived_source_url(url, 3), "https://example.com/blog/post-enhanced-v3");
    }
}

//! Application configuration for Blogsmith.
//!
//! User config lives at `~/.blogsmith/blogsmith.toml`.
//! CLI flags override config file values, which override defaults.
//! File sections are converted into runtime option structs that are passed
//! explicitly into the crawler, reference finder, synthesizer and pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BlogsmithError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blogsmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blogsmith";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "blogsmith.db";

// ---------------------------------------------------------------------------
// Config structs (matching blogsmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Web search settings for reference discovery.
    #[serde(default)]
    pub search: SearchConfig,

    /// Generative model settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Enhancement pipeline pacing and limits.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Blog listing page to discover articles from.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Substring a link path must contain to count as an article.
    #[serde(default = "default_link_pattern")]
    pub link_pattern: String,

    /// Maximum number of articles per crawl.
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Pause between article fetches, in ms.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Timeout for the listing page fetch, in seconds.
    #[serde(default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,

    /// Timeout for each article fetch, in seconds.
    #[serde(default = "default_article_timeout")]
    pub article_timeout_secs: u64,

    /// Author used when a page names none.
    #[serde(default = "default_author")]
    pub default_author: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            link_pattern: default_link_pattern(),
            max_articles: default_max_articles(),
            request_delay_ms: default_request_delay(),
            listing_timeout_secs: default_listing_timeout(),
            article_timeout_secs: default_article_timeout(),
            default_author: default_author(),
        }
    }
}

fn default_listing_url() -> String {
    "https://www.beyondchats.com/blogs".into()
}
fn default_link_pattern() -> String {
    "/blog".into()
}
fn default_max_articles() -> usize {
    5
}
fn default_request_delay() -> u64 {
    1_000
}
fn default_listing_timeout() -> u64 {
    15
}
fn default_article_timeout() -> u64 {
    10
}
fn default_author() -> String {
    "BeyondChats".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search results page URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Query string parameter carrying the topic.
    #[serde(default = "default_query_param")]
    pub query_param: String,

    /// Path of the redirect wrapper around result links.
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,

    /// Query parameter of the redirect wrapper holding the destination.
    #[serde(default = "default_redirect_param")]
    pub redirect_param: String,

    /// Maximum number of reference URLs per topic.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Result hosts to discard (matched as domain suffixes).
    #[serde(default = "default_excluded_domains")]
    pub excluded_domains: Vec<String>,

    /// Timeout for the search request, in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            query_param: default_query_param(),
            redirect_path: default_redirect_path(),
            redirect_param: default_redirect_param(),
            max_results: default_max_results(),
            excluded_domains: default_excluded_domains(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.google.com/search".into()
}
fn default_query_param() -> String {
    "q".into()
}
fn default_redirect_path() -> String {
    "/url".into()
}
fn default_redirect_param() -> String {
    "q".into()
}
fn default_max_results() -> usize {
    2
}
fn default_excluded_domains() -> Vec<String> {
    vec!["google.com".into(), "youtube.com".into()]
}
fn default_search_timeout() -> u64 {
    10
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Timeout for the completion request, in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_generation_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_generation_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_max_tokens() -> u32 {
    3_000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_generation_timeout() -> u64 {
    15
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pause between articles, in ms.
    #[serde(default = "default_article_delay")]
    pub article_delay_ms: u64,

    /// Pause between reference fetches, in ms.
    #[serde(default = "default_reference_delay")]
    pub reference_delay_ms: u64,

    /// Characters of each reference body kept for synthesis and provenance.
    #[serde(default = "default_reference_excerpt")]
    pub reference_excerpt_chars: usize,

    /// References with a shorter body are discarded.
    #[serde(default = "default_min_reference")]
    pub min_reference_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            article_delay_ms: default_article_delay(),
            reference_delay_ms: default_reference_delay(),
            reference_excerpt_chars: default_reference_excerpt(),
            min_reference_chars: default_min_reference(),
        }
    }
}

fn default_article_delay() -> u64 {
    2_000
}
fn default_reference_delay() -> u64 {
    1_000
}
fn default_reference_excerpt() -> usize {
    2_000
}
fn default_min_reference() -> usize {
    100
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path. Empty means `~/.blogsmith/blogsmith.db`.
    #[serde(default)]
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration for the site crawler.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub listing_url: String,
    pub link_pattern: String,
    pub max_articles: usize,
    pub request_delay: Duration,
    pub listing_timeout: Duration,
    pub article_timeout: Duration,
    pub default_author: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let site = &config.site;
        Self {
            listing_url: site.listing_url.clone(),
            link_pattern: site.link_pattern.clone(),
            max_articles: site.max_articles,
            request_delay: Duration::from_millis(site.request_delay_ms),
            listing_timeout: Duration::from_secs(site.listing_timeout_secs),
            article_timeout: Duration::from_secs(site.article_timeout_secs),
            default_author: site.default_author.clone(),
        }
    }
}

/// Runtime options for the reference finder.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub endpoint: String,
    pub query_param: String,
    pub redirect_path: String,
    pub redirect_param: String,
    pub max_results: usize,
    pub excluded_domains: Vec<String>,
    pub timeout: Duration,
}

impl From<&AppConfig> for SearchOptions {
    fn from(config: &AppConfig) -> Self {
        let search = &config.search;
        Self {
            endpoint: search.endpoint.clone(),
            query_param: search.query_param.clone(),
            redirect_path: search.redirect_path.clone(),
            redirect_param: search.redirect_param.clone(),
            max_results: search.max_results,
            excluded_domains: search.excluded_domains.clone(),
            timeout: Duration::from_secs(search.timeout_secs),
        }
    }
}

/// Runtime options for the synthesizer. `api_key: None` selects rule-based only.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl GenerationOptions {
    /// Build options from config, reading the credential from the environment.
    pub fn from_env(config: &AppConfig) -> Self {
        Self::with_api_key(config, resolve_api_key(config))
    }

    /// Build options from config with an explicit credential.
    pub fn with_api_key(config: &AppConfig, api_key: Option<String>) -> Self {
        let generation = &config.generation;
        Self {
            api_key,
            endpoint: generation.endpoint.clone(),
            model: generation.model.clone(),
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
            timeout: Duration::from_secs(generation.timeout_secs),
        }
    }
}

/// Runtime options for the enhancement pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub article_delay: Duration,
    pub reference_delay: Duration,
    pub reference_excerpt_chars: usize,
    pub min_reference_chars: usize,
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        let pipeline = &config.pipeline;
        Self {
            article_delay: Duration::from_millis(pipeline.article_delay_ms),
            reference_delay: Duration::from_millis(pipeline.reference_delay_ms),
            reference_excerpt_chars: pipeline.reference_excerpt_chars,
            min_reference_chars: pipeline.min_reference_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blogsmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlogsmithError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blogsmith/blogsmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database path: explicit config value, else the config directory.
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    if config.storage.db_path.is_empty() {
        Ok(config_dir()?.join(DB_FILE_NAME))
    } else {
        Ok(PathBuf::from(&config.storage.db_path))
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlogsmithError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BlogsmithError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlogsmithError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlogsmithError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlogsmithError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the generation API key from the configured env var.
/// An unset or empty variable is a valid configuration and yields `None`.
pub fn resolve_api_key(config: &AppConfig) -> Option<String> {
    match std::env::var(&config.generation.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("listing_url"));
        assert!(toml_str.contains("GROQ_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.site.max_articles, 5);
        assert_eq!(parsed.search.max_results, 2);
        assert_eq!(parsed.generation.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[site]
listing_url = "https://blog.example.com/posts"
max_articles = 3

[search]
excluded_domains = ["example.org"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.site.listing_url, "https://blog.example.com/posts");
        assert_eq!(config.site.max_articles, 3);
        assert_eq!(config.site.request_delay_ms, 1_000);
        assert_eq!(config.search.excluded_domains, vec!["example.org".to_string()]);
        assert_eq!(config.pipeline.article_delay_ms, 2_000);
    }

    #[test]
    fn runtime_options_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.max_articles, 5);
        assert_eq!(crawl.request_delay, Duration::from_secs(1));
        assert_eq!(crawl.listing_timeout, Duration::from_secs(15));

        let pipeline = PipelineOptions::from(&app);
        assert_eq!(pipeline.article_delay, Duration::from_secs(2));
        assert_eq!(pipeline.reference_excerpt_chars, 2_000);
    }

    #[test]
    fn missing_api_key_is_not_an_error() {
        let mut config = AppConfig::default();
        // Unique env var name to avoid interfering with other tests
        config.generation.api_key_env = "BLOGSMITH_TEST_NONEXISTENT_KEY_12345".into();
        assert!(resolve_api_key(&config).is_none());

        let options = GenerationOptions::from_env(&config);
        assert!(options.api_key.is_none());
        assert_eq!(options.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn explicit_db_path_wins() {
        let mut config = AppConfig::default();
        config.storage.db_path = "/tmp/articles.db".into();
        assert_eq!(database_path(&config).unwrap(), PathBuf::from("/tmp/articles.db"));
    }
}

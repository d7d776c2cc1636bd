//! Two-tier synthesis of enhanced article bodies.
//!
//! [`ExternalModelStrategy`] asks a hosted chat-completion endpoint for a
//! rewrite; [`RuleBasedStrategy`] composes a structured document locally.
//! [`Synthesizer`] tries the external tier when a credential is configured and
//! falls back to the rule-based tier on any failure, so callers always get a
//! body back.

mod external;
mod rule_based;

use blogsmith_shared::{GenerationMethod, GenerationOptions, ReferenceDocument, Result, SourceDocument};
use tracing::{debug, warn};
use url::Url;

pub use external::ExternalModelStrategy;
pub use rule_based::RuleBasedStrategy;

/// Label used when a reference URL has no parseable host.
pub const UNKNOWN_DOMAIN: &str = "Source";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Output of one synthesis tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub body: String,
    pub method: GenerationMethod,
    /// Model identifier, only set by the external tier.
    pub model: Option<String>,
}

/// One way of producing an enhanced body from an original and its references.
#[allow(async_fn_in_trait)]
pub trait SynthesisStrategy {
    async fn synthesize(
        &self,
        original: &SourceDocument,
        references: &[ReferenceDocument],
    ) -> Result<Synthesis>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Primary strategy with a rule-based fallback.
///
/// Without a primary (no credential configured) every call goes straight to
/// the rule-based tier.
pub struct Synthesizer<P = ExternalModelStrategy> {
    primary: Option<P>,
    fallback: RuleBasedStrategy,
}

impl Synthesizer {
    /// Build the synthesizer from generation options. The external tier is
    /// enabled only when `options.api_key` is set.
    pub fn new(options: GenerationOptions) -> Result<Self> {
        let primary = match options.api_key.clone() {
            Some(key) => Some(ExternalModelStrategy::new(&options, key)?),
            None => {
                debug!("no generation credential configured, using rule-based synthesis only");
                None
            }
        };
        Ok(Self::with_primary(primary))
    }
}

impl<P: SynthesisStrategy> Synthesizer<P> {
    /// Wrap an arbitrary primary strategy.
    pub fn with_primary(primary: Option<P>) -> Self {
        Self {
            primary,
            fallback: RuleBasedStrategy,
        }
    }

    /// Whether an external tier is configured.
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Produce an enhanced body. Never fails.
    pub async fn synthesize(
        &self,
        original: &SourceDocument,
        references: &[ReferenceDocument],
    ) -> Synthesis {
        if let Some(primary) = &self.primary {
            match primary.synthesize(original, references).await {
                Ok(synthesis) => return synthesis,
                Err(e) => {
                    warn!(
                        strategy = primary.name(),
                        error = %e,
                        "external synthesis failed, falling back to rule-based"
                    );
                }
            }
        }
        self.fallback.compose(original, references)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Hostname of `url` with a leading `www.` removed, or [`UNKNOWN_DOMAIN`].
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .map(|host| host.strip_prefix("www.").map(str::to_owned).unwrap_or(host))
        .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogsmith_shared::BlogsmithError;
    use chrono::Utc;

    struct FailingStrategy;

    impl SynthesisStrategy for FailingStrategy {
        async fn synthesize(
            &self,
            _original: &SourceDocument,
            _references: &[ReferenceDocument],
        ) -> Result<Synthesis> {
            Err(BlogsmithError::Generation("HTTP 500".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct EchoStrategy;

    impl SynthesisStrategy for EchoStrategy {
        async fn synthesize(
            &self,
            original: &SourceDocument,
            _references: &[ReferenceDocument],
        ) -> Result<Synthesis> {
            Ok(Synthesis {
                body: format!("rewritten: {}", original.title),
                method: GenerationMethod::ExternalModel,
                model: Some("echo".into()),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn original() -> SourceDocument {
        SourceDocument::new("X", "A. B. C. D.", "https://example.com/blog/x", "me", Utc::now())
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(domain_of("https://www.example.com/a/b"), "example.com");
        assert_eq!(domain_of("http://blog.example.org"), "blog.example.org");
    }

    #[test]
    fn domain_of_malformed_url_is_placeholder() {
        assert_eq!(domain_of("not a url"), UNKNOWN_DOMAIN);
        assert_eq!(domain_of(""), UNKNOWN_DOMAIN);
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_rule_based() {
        let synthesizer = Synthesizer::with_primary(Some(FailingStrategy));
        let out = synthesizer.synthesize(&original(), &[]).await;
        assert_eq!(out.method, GenerationMethod::RuleBased);
        assert!(out.model.is_none());
        assert!(out.body.starts_with("# X"));
    }

    #[tokio::test]
    async fn successful_primary_is_used_verbatim() {
        let synthesizer = Synthesizer::with_primary(Some(EchoStrategy));
        let out = synthesizer.synthesize(&original(), &[]).await;
        assert_eq!(out.body, "rewritten: X");
        assert_eq!(out.method, GenerationMethod::ExternalModel);
    }

    #[tokio::test]
    async fn no_credential_means_rule_based() {
        let options = GenerationOptions {
            api_key: None,
            endpoint: "http://127.0.0.1:9/v1/chat/completions".into(),
            model: "m".into(),
            max_tokens: 10,
            temperature: 0.7,
            timeout: std::time::Duration::from_secs(1),
        };
        let synthesizer = Synthesizer::new(options).unwrap();
        assert!(!synthesizer.has_primary());

        let out = synthesizer.synthesize(&original(), &[]).await;
        assert_eq!(out.method, GenerationMethod::RuleBased);
    }
}

//! Chat-completion rewrite via a hosted, OpenAI-compatible endpoint.

use blogsmith_shared::{
    BlogsmithError, GenerationMethod, GenerationOptions, ReferenceDocument, Result,
    SourceDocument, truncate_chars,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Synthesis, SynthesisStrategy};

/// Characters of the original body embedded in the prompt.
const PROMPT_BODY_CHARS: usize = 1000;

/// Characters of each reference excerpt embedded in the prompt.
const PROMPT_REFERENCE_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Sends one composite prompt and uses the reply verbatim as the body.
pub struct ExternalModelStrategy {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ExternalModelStrategy {
    /// Create a strategy bound to `options.endpoint` with the given credential.
    pub fn new(options: &GenerationOptions, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| BlogsmithError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: options.endpoint.clone(),
            model: options.model.clone(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        })
    }
}

impl SynthesisStrategy for ExternalModelStrategy {
    #[instrument(skip_all, fields(model = %self.model, references = references.len()))]
    async fn synthesize(
        &self,
        original: &SourceDocument,
        references: &[ReferenceDocument],
    ) -> Result<Synthesis> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(original, references),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(endpoint = %self.endpoint, "requesting rewrite");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BlogsmithError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogsmithError::Generation(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BlogsmithError::Generation(format!("malformed response: {e}")))?;

        let body = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| BlogsmithError::Generation("response contained no text".into()))?;

        Ok(Synthesis {
            body,
            method: GenerationMethod::ExternalModel,
            model: Some(self.model.clone()),
        })
    }

    fn name(&self) -> &str {
        "external-model"
    }
}

/// Single composite prompt: title, leading body, and a slice of each reference.
fn build_prompt(original: &SourceDocument, references: &[ReferenceDocument]) -> String {
    let refs = references
        .iter()
        .map(|r| {
            format!(
                "- {}\n{}",
                r.title,
                truncate_chars(&r.excerpt_body, PROMPT_REFERENCE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Rewrite this article professionally:\n\n\
         ORIGINAL: {}\n{}\n\n\
         REFERENCES:\n{refs}\n\n\
         Make it engaging, well-structured, and professional.",
        original.title,
        truncate_chars(&original.body, PROMPT_BODY_CHARS),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::synthesis::Synthesizer;
    use chrono::Utc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(endpoint: String) -> GenerationOptions {
        GenerationOptions {
            api_key: Some("test-key".into()),
            endpoint,
            model: "llama-3.3-70b-versatile".into(),
            max_tokens: 3000,
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        }
    }

    fn original() -> SourceDocument {
        SourceDocument::new(
            "Chatbots 101",
            &"Chatbots answer questions. ".repeat(100),
            "https://example.com/blog/chatbots-101",
            "BeyondChats",
            Utc::now(),
        )
    }

    fn reference() -> ReferenceDocument {
        ReferenceDocument {
            title: "Guide".into(),
            source_url: "https://guide.example.com/a".into(),
            excerpt_body: "r".repeat(1_500),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn prompt_truncates_body_and_references() {
        let prompt = build_prompt(&original(), &[reference()]);
        assert!(prompt.starts_with("Rewrite this article professionally:\n\nORIGINAL: Chatbots 101\n"));
        assert!(prompt.contains("REFERENCES:\n- Guide\n"));
        assert!(prompt.contains(&"r".repeat(PROMPT_REFERENCE_CHARS)));
        assert!(!prompt.contains(&"r".repeat(PROMPT_REFERENCE_CHARS + 1)));
        // 1000-char body plus fixed framing, well under the untruncated 2700
        assert!(prompt.len() < 1_000 + 600 + 200);
    }

    #[tokio::test]
    async fn successful_reply_is_used_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "# Better Article\n\nBody." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let opts = options(format!("{}/v1/chat/completions", server.uri()));
        let strategy = ExternalModelStrategy::new(&opts, "test-key".into()).unwrap();
        let out = strategy.synthesize(&original(), &[reference()]).await.unwrap();

        assert_eq!(out.body, "# Better Article\n\nBody.");
        assert_eq!(out.method, GenerationMethod::ExternalModel);
        assert_eq!(out.model.as_deref(), Some("llama-3.3-70b-versatile"));
    }

    #[tokio::test]
    async fn server_error_falls_back_to_rule_based() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let opts = options(format!("{}/v1/chat/completions", server.uri()));
        let strategy = ExternalModelStrategy::new(&opts, "test-key".into()).unwrap();
        assert!(matches!(
            strategy.synthesize(&original(), &[]).await,
            Err(BlogsmithError::Generation(_))
        ));

        let synthesizer = Synthesizer::new(opts).unwrap();
        assert!(synthesizer.has_primary());
        let out = synthesizer.synthesize(&original(), &[]).await;
        assert_eq!(out.method, GenerationMethod::RuleBased);
    }

    #[tokio::test]
    async fn empty_choices_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let opts = options(format!("{}/v1/chat/completions", server.uri()));
        let strategy = ExternalModelStrategy::new(&opts, "test-key".into()).unwrap();
        let err = strategy.synthesize(&original(), &[]).await.unwrap_err();
        assert!(err.to_string().contains("no text"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let opts = options(format!("{}/v1/chat/completions", server.uri()));
        let strategy = ExternalModelStrategy::new(&opts, "test-key".into()).unwrap();
        assert!(matches!(
            strategy.synthesize(&original(), &[]).await,
            Err(BlogsmithError::Generation(_))
        ));
    }
}

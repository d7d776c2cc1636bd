//! Reference discovery via web search.
//!
//! Given a topic (usually an article title), the [`ReferenceFinder`] queries a
//! general search page, unwraps result links, and returns a short list of
//! candidate reference URLs. Any fetch or parse failure yields an empty list:
//! zero references is an expected outcome, not an error.

mod parser;

use blogsmith_shared::{BlogsmithError, Result, SearchOptions};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use parser::ResultFilter;

/// Maximum number of redirects to follow when fetching the results page.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for search requests.
const USER_AGENT: &str = "Mozilla/5.0";

// ---------------------------------------------------------------------------
// ReferenceFinder
// ---------------------------------------------------------------------------

/// Finds external reference URLs for a topic.
pub struct ReferenceFinder {
    options: SearchOptions,
    client: Client,
}

impl ReferenceFinder {
    /// Create a finder with the given search options.
    pub fn new(options: SearchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(options.timeout)
            .build()
            .map_err(|e| BlogsmithError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { options, client })
    }

    /// Return up to `max_results` unique reference URLs for `topic`.
    ///
    /// Never fails; search errors are logged and produce an empty list.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn find(&self, topic: &str) -> Vec<String> {
        match self.search(topic).await {
            Ok(urls) => {
                info!(found = urls.len(), "reference search complete");
                urls
            }
            Err(e) => {
                warn!(error = %e, "reference search failed, continuing without references");
                Vec::new()
            }
        }
    }

    /// Run the search, surfacing failures as [`BlogsmithError::Search`].
    pub async fn search(&self, topic: &str) -> Result<Vec<String>> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Ok(Vec::new());
        }

        let endpoint = Url::parse(&self.options.endpoint).map_err(|e| {
            BlogsmithError::Search(format!("invalid endpoint {}: {e}", self.options.endpoint))
        })?;

        debug!(endpoint = %endpoint, "querying search page");

        let response = self
            .client
            .get(endpoint.clone())
            .query(&[(self.options.query_param.as_str(), topic)])
            .send()
            .await
            .map_err(|e| BlogsmithError::Search(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlogsmithError::Search(format!("{endpoint}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| BlogsmithError::Search(format!("{endpoint}: failed to read body: {e}")))?;

        let filter = ResultFilter {
            endpoint: &endpoint,
            redirect_path: &self.options.redirect_path,
            redirect_param: &self.options.redirect_param,
            excluded_domains: &self.options.excluded_domains,
            max_results: self.options.max_results,
        };

        Ok(parser::parse_search_results(&body, &filter))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(endpoint: String, timeout: Duration) -> SearchOptions {
        SearchOptions {
            endpoint,
            query_param: "q".into(),
            redirect_path: "/url".into(),
            redirect_param: "q".into(),
            max_results: 2,
            excluded_domains: vec!["google.com".into(), "youtube.com".into()],
            timeout,
        }
    }

    #[tokio::test]
    async fn test_find_with_mock_server() {
        let server = MockServer::start().await;

        let page = r#"<html><body>
            <a href="/url?q=https://www.youtube.com/watch&sa=U">Video</a>
            <a href="/url?q=https://one.example.com/a&sa=U">One</a>
            <a href="/url?q=https://two.example.com/b&sa=U">Two</a>
            <a href="/url?q=https://three.example.com/c&sa=U">Three</a>
        </body></html>"#;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "AI chatbots for support"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let finder = ReferenceFinder::new(options(
            format!("{}/search", server.uri()),
            Duration::from_secs(5),
        ))
        .unwrap();

        let urls = finder.find("AI chatbots for support").await;
        assert_eq!(urls, vec!["https://one.example.com/a", "https://two.example.com/b"]);
    }

    #[tokio::test]
    async fn test_http_error_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let finder = ReferenceFinder::new(options(
            format!("{}/search", server.uri()),
            Duration::from_secs(5),
        ))
        .unwrap();

        assert!(finder.find("anything").await.is_empty());
        assert!(matches!(
            finder.search("anything").await,
            Err(BlogsmithError::Search(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_yields_empty_within_bound() {
        let server = MockServer::start().await;
        Mock::given(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let finder = ReferenceFinder::new(options(
            format!("{}/search", server.uri()),
            Duration::from_millis(300),
        ))
        .unwrap();

        let start = Instant::now();
        let urls = finder.find("slow topic").await;
        assert!(urls.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_blank_topic_skips_request() {
        let finder =
            ReferenceFinder::new(options("http://127.0.0.1:9/search".into(), Duration::from_secs(1)))
                .unwrap();
        assert!(finder.find("   ").await.is_empty());
    }
}

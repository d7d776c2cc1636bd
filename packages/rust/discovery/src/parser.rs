//! Search results page parser.
//!
//! Result anchors on the search page are wrapped in a redirect link of the
//! form `<redirect_path>?<redirect_param>=<destination>&...`. The parser
//! unwraps the destination and filters out links back to the search engine
//! and to excluded hosts. This depends on the provider's current markup and
//! is a best-effort heuristic.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Rules for unwrapping and filtering result links.
#[derive(Debug, Clone)]
pub(crate) struct ResultFilter<'a> {
    /// The search endpoint; relative hrefs resolve against it.
    pub endpoint: &'a Url,
    pub redirect_path: &'a str,
    pub redirect_param: &'a str,
    pub excluded_domains: &'a [String],
    pub max_results: usize,
}

/// Extract unique destination URLs from a search results page, in page order.
pub(crate) fn parse_search_results(html: &str, filter: &ResultFilter<'_>) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    for el in doc.select(&link_sel) {
        if results.len() >= filter.max_results {
            break;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(destination) = unwrap_redirect(href, filter) else {
            continue;
        };
        if is_excluded(&destination, filter) {
            continue;
        }
        let destination = destination.to_string();
        if seen.insert(destination.clone()) {
            results.push(destination);
        }
    }

    results
}

/// Pull the destination out of a redirect-wrapper href.
fn unwrap_redirect(href: &str, filter: &ResultFilter<'_>) -> Option<Url> {
    let wrapper = filter.endpoint.join(href).ok()?;
    if wrapper.host_str() != filter.endpoint.host_str() || wrapper.path() != filter.redirect_path {
        return None;
    }

    let target = wrapper
        .query_pairs()
        .find(|(key, _)| key == filter.redirect_param)
        .map(|(_, value)| value.into_owned())?;

    let url = Url::parse(&target).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// True if the destination points at the search engine or an excluded host.
fn is_excluded(url: &Url, filter: &ResultFilter<'_>) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    if Some(host) == filter.endpoint.host_str()
        && url.port_or_known_default() == filter.endpoint.port_or_known_default()
    {
        return true;
    }
    if filter
        .endpoint
        .domain()
        .map(|d| d.strip_prefix("www.").unwrap_or(d))
        .is_some_and(|engine| matches_domain(host, engine))
    {
        return true;
    }
    filter
        .excluded_domains
        .iter()
        .any(|domain| matches_domain(host, domain))
}

/// `host` is `domain` or one of its subdomains.
fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

//! Text-snippet web search used when a company's own site yields nothing.
//!
//! Queries the HTML endpoint of DuckDuckGo and keeps only result titles and
//! snippets; result links are never followed.

use std::sync::LazyLock;

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

use categorizer_shared::{ClassificationError, Result, ScrapeConfig};

use crate::fetcher::{USER_AGENTS, fetch_html};

static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.result__body").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").unwrap());
static SNIPPET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__snippet").unwrap());

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
}

/// Search for `descriptor` and aggregate the top results into one text blob.
///
/// Returns an empty string on any failure or when nothing was found.
#[instrument(skip_all, fields(descriptor = %descriptor))]
pub async fn web_search(client: &Client, descriptor: &str, config: &ScrapeConfig) -> String {
    match try_web_search(client, descriptor, config).await {
        Ok(results) if results.is_empty() => {
            warn!("web search returned no results");
            String::new()
        }
        Ok(results) => {
            info!(results = results.len(), "web search succeeded");
            results
                .iter()
                .map(|r| format!("{}\n{}\n\n", r.title, r.snippet))
                .collect::<Vec<_>>()
                .join(" ")
        }
        Err(e) => {
            warn!(error = %e, "web search failed");
            String::new()
        }
    }
}

async fn try_web_search(
    client: &Client,
    descriptor: &str,
    config: &ScrapeConfig,
) -> Result<Vec<SearchResult>> {
    let mut url = Url::parse(&config.search_url)
        .map_err(|e| ClassificationError::config(format!("invalid search URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("q", &format!("{descriptor} company information"));

    let html = fetch_html(client, &url, USER_AGENTS[0], config.fetch_timeout).await?;
    Ok(parse_search_results(&html, config.search_results))
}

/// Extract up to `limit` results from a search results page.
///
/// Results lacking a title or snippet are skipped.
pub fn parse_search_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);

    doc.select(&RESULT_SELECTOR)
        .filter_map(|result| {
            let title = first_text(&result, &TITLE_SELECTOR)?;
            let snippet = first_text(&result, &SNIPPET_SELECTOR)?;
            Some(SearchResult { title, snippet })
        })
        .take(limit)
        .collect()
}

fn first_text(parent: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    parent
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result_html(n: usize) -> String {
        let mut body = String::from("<html><body>");
        for i in 1..=n {
            body.push_str(&format!(
                r#"<div class="result__body">
                    <h2><a class="result__a" href="https://example.com/{i}">Result {i}</a></h2>
                    <a class="result__snippet" href="https://example.com/{i}">Snippet {i}</a>
                </div>"#
            ));
        }
        body.push_str("</body></html>");
        body
    }

    fn config(server: &MockServer) -> ScrapeConfig {
        ScrapeConfig {
            search_url: format!("{}/html/", server.uri()),
            fetch_timeout: Duration::from_secs(5),
            ..ScrapeConfig::default()
        }
    }

    #[test]
    fn parses_titles_and_snippets() {
        let results = parse_search_results(&result_html(2), 5);
        assert_eq!(
            results,
            vec![
                SearchResult {
                    title: "Result 1".into(),
                    snippet: "Snippet 1".into()
                },
                SearchResult {
                    title: "Result 2".into(),
                    snippet: "Snippet 2".into()
                },
            ]
        );
    }

    #[test]
    fn incomplete_results_are_skipped() {
        let html = r#"<div class="result__body"><a class="result__a">Only title</a></div>
            <div class="result__body"><a class="result__a">T</a><a class="result__snippet">S</a></div>"#;
        let results = parse_search_results(html, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "T");
    }

    #[tokio::test]
    async fn aggregates_top_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "Acme Corp company information"))
            .respond_with(ResponseTemplate::new(200).set_body_string(result_html(7)))
            .mount(&server)
            .await;

        let client = crate::build_client().unwrap();
        let text = web_search(&client, "Acme Corp", &config(&server)).await;

        assert!(text.starts_with("Result 1\nSnippet 1\n\n Result 2"));
        assert!(text.contains("Result 5"));
        assert!(!text.contains("Result 6"));
    }

    #[tokio::test]
    async fn failure_yields_empty_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = crate::build_client().unwrap();
        assert_eq!(web_search(&client, "Acme", &config(&server)).await, "");
    }

    #[tokio::test]
    async fn no_results_yields_empty_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = crate::build_client().unwrap();
        assert_eq!(web_search(&client, "Acme", &config(&server)).await, "");
    }
}

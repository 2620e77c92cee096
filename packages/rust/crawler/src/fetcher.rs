//! Single-page fetching with browser-like headers.
//!
//! [`fetch_page_text`] never fails: every error becomes a human-readable
//! failure string starting with one of [`FETCH_FAILURE_PREFIXES`], which
//! downstream code treats as "no content".

use std::time::Duration;

use rand::seq::IndexedRandom;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use categorizer_shared::{ClassificationError, Result, ScrapeConfig};

use crate::decode::decode_body;
use crate::text::{html_to_text, truncate_chars};

/// Browser identities rotated across page fetches.
pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
];

/// Prefixes of the failure strings produced by [`fetch_page_text`].
pub const FETCH_FAILURE_PREFIXES: [&str; 2] = ["Sorry,", "An unexpected error"];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
const ACCEPT_ENCODING: &str = "gzip, deflate, br";
const REFERER: &str = "https://www.google.com/";

/// Build the shared HTTP client.
///
/// Timeouts and user agents are set per request, since discovery, fetching,
/// and search each use their own.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ClassificationError::Network(format!("failed to build HTTP client: {e}")))
}

/// Pick one of [`USER_AGENTS`] at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

fn browser_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(header::USER_AGENT, ua);
    }
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
    headers
}

/// GET `url` and return the decoded body.
///
/// HTTP 403 maps to [`ClassificationError::Forbidden`]; any other non-success
/// status or transport failure maps to [`ClassificationError::Network`].
pub async fn fetch_html(
    client: &Client,
    url: &Url,
    user_agent: &str,
    timeout: Duration,
) -> Result<String> {
    let response = client
        .get(url.as_str())
        .headers(browser_headers(user_agent))
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| ClassificationError::Network(e.to_string()))?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN {
        return Err(ClassificationError::Forbidden(url.to_string()));
    }
    if !status.is_success() {
        return Err(ClassificationError::Network(format!(
            "{status} for url: {url}"
        )));
    }

    let content_encoding = header_string(response.headers(), header::CONTENT_ENCODING);
    let content_type = header_string(response.headers(), header::CONTENT_TYPE);

    let body = response
        .bytes()
        .await
        .map_err(|e| ClassificationError::Network(format!("body read failed: {e}")))?;

    Ok(decode_body(
        &body,
        content_encoding.as_deref(),
        content_type.as_deref(),
    ))
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Fetch `url` and return its visible text, truncated to the configured cap.
///
/// Failures are returned as text rather than errors; see [`is_failure_text`].
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_page_text(client: &Client, url: &Url, config: &ScrapeConfig) -> String {
    let user_agent = random_user_agent();
    debug!(user_agent, "fetching page");

    match fetch_html(client, url, user_agent, config.fetch_timeout).await {
        Ok(html) => {
            let text = html_to_text(&html);
            truncate_chars(&text, config.max_page_chars)
        }
        Err(ClassificationError::Forbidden(_)) => {
            warn!("access forbidden");
            format!(
                "Sorry, access to this website ({url}) is forbidden. The site may have anti-scraping measures in place."
            )
        }
        Err(ClassificationError::Network(e)) => {
            warn!(error = %e, "fetch failed");
            format!("Sorry, I couldn't fetch the content from the webpage {url}. Error: {e}")
        }
        Err(e) => {
            warn!(error = %e, "unexpected fetch failure");
            format!("An unexpected error occurred while processing the webpage {url}. Error: {e}")
        }
    }
}

/// True when `text` is empty or one of the fetcher's failure strings.
pub fn is_failure_text(text: &str) -> bool {
    text.trim().is_empty()
        || FETCH_FAILURE_PREFIXES
            .iter()
            .any(|prefix| text.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> ScrapeConfig {
        ScrapeConfig {
            fetch_timeout: Duration::from_secs(5),
            ..ScrapeConfig::default()
        }
    }

    #[tokio::test]
    async fn fetches_visible_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("referer", REFERER))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><style>p{}</style><script>var x = 1;</script></head>\
                 <body><h1>Acme Corp</h1><p>We make   anvils.</p></body></html>",
            ))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let text = fetch_page_text(&client, &url, &config()).await;

        assert_eq!(text, "Acme Corp We make anvils.");
        assert!(!is_failure_text(&text));
    }

    #[tokio::test]
    async fn forbidden_page_yields_forbidden_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let text = fetch_page_text(&client, &url, &config()).await;

        assert!(text.starts_with("Sorry, access to this website"));
        assert!(text.contains("forbidden"));
        assert!(is_failure_text(&text));
    }

    #[tokio::test]
    async fn server_error_yields_fetch_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = Url::parse(&format!("{}/about", server.uri())).unwrap();
        let text = fetch_page_text(&client, &url, &config()).await;

        assert!(text.starts_with("Sorry, I couldn't fetch the content from the webpage"));
        assert!(text.contains("/about"));
        assert!(is_failure_text(&text));
    }

    #[tokio::test]
    async fn long_pages_are_truncated() {
        let server = MockServer::start().await;
        let body = format!("<html><body><p>{}</p></body></html>", "a".repeat(500));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let config = ScrapeConfig {
            max_page_chars: 100,
            ..config()
        };
        let text = fetch_page_text(&client, &url, &config).await;

        assert_eq!(text.chars().count(), 103);
        assert!(text.ends_with("..."));
    }

    #[tokio::test]
    async fn gzip_body_is_decoded() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"<html><body><p>Compressed hello</p></body></html>")
            .unwrap();
        let gz = enc.finish().unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_raw(gz, "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        let text = fetch_page_text(&client, &url, &config()).await;

        assert_eq!(text, "Compressed hello");
    }

    #[test]
    fn failure_text_detection() {
        assert!(is_failure_text(""));
        assert!(is_failure_text("   \n"));
        assert!(is_failure_text("An unexpected error occurred while processing"));
        assert!(!is_failure_text("Acme sells anvils."));
    }

    #[test]
    fn user_agent_is_from_pool() {
        for _ in 0..10 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }
}

//! Pulling a website address out of free-form user input.

use std::sync::LazyLock;

use regex::Regex;

static URL_WITH_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)",
    )
    .expect("URL regex is valid")
});

static DOMAIN_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)",
    )
    .expect("domain regex is valid")
});

/// Find the website address in `input`.
///
/// Prefers the last `http(s)://` URL; otherwise takes the last domain-like
/// token and prefixes `https://`.
pub fn extract_url_from_input(input: &str) -> Option<String> {
    if let Some(m) = URL_WITH_SCHEME.find_iter(input).last() {
        return Some(m.as_str().to_string());
    }

    DOMAIN_LIKE
        .find_iter(input)
        .last()
        .map(|m| format!("https://{}", m.as_str()))
}

/// Canonical `https://host/path` form: scheme and `www.` dropped, no trailing slash.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    format!("https://{}", url.trim_end_matches('/'))
}

//! Page fetching, body decoding, and the web-search fallback.
//!
//! This crate provides:
//! - [`fetch_page_text`] — fetch one page and reduce it to visible text, never failing
//! - [`fetch_html`] — the shared GET used by page discovery
//! - [`decode`] — decompression and charset detection for raw bodies
//! - [`web_search`] — title/snippet aggregation when a site yields nothing

pub mod decode;
pub mod fetcher;
pub mod search;
pub mod text;

pub use decode::{decode_body, decode_text, decompress};
pub use fetcher::{
    FETCH_FAILURE_PREFIXES, USER_AGENTS, build_client, fetch_html, fetch_page_text,
    is_failure_text, random_user_agent,
};
pub use search::{SearchResult, parse_search_results, web_search};
pub use text::{html_to_text, truncate_chars};

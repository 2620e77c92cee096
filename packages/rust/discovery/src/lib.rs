//! Page discovery: locating a company's about and product pages.
//!
//! Given a homepage, every same-site link is scored with [`score_link`] and
//! the best-ranked candidates are assigned to the about and product slots.
//! Discovery never fails; any error yields a home-only [`SiteMap`].

mod scoring;

use std::sync::LazyLock;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use categorizer_crawler::{USER_AGENTS, fetch_html};
use categorizer_shared::{ClassificationError, Result, ScrapeConfig, SiteMap};

pub use scoring::{ScoredLink, score_link};

/// Score given to the homepage so it always ranks first.
const HOME_SCORE: i32 = 100;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Parse a website address, assuming `https://` when no scheme is given.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClassificationError::validation("empty website address"));
    }

    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    Url::parse(&with_scheme)
        .map_err(|e| ClassificationError::validation(format!("invalid website address {raw:?}: {e}")))
}

/// Find the about and product pages linked from `base`.
#[instrument(skip_all, fields(base = %base))]
pub async fn find_pages(client: &Client, base: &Url, config: &ScrapeConfig) -> SiteMap {
    let html = match fetch_html(client, base, USER_AGENTS[0], config.discovery_timeout).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "page discovery failed, using homepage only");
            return SiteMap::home_only(base.clone());
        }
    };

    let candidates = scored_candidates(&html, base);
    for link in candidates.iter().take(10) {
        debug!(url = %link.url, score = link.score, text = link.anchor_text.trim(), "top link");
    }

    let sitemap = assign_pages(base, &candidates);
    info!(
        about = sitemap.about.as_ref().map(Url::as_str),
        product = sitemap.product.as_ref().map(Url::as_str),
        "pages identified"
    );
    sitemap
}

// ---------------------------------------------------------------------------
// Candidate extraction
// ---------------------------------------------------------------------------

/// Score every same-site link in `html`, best first.
///
/// The homepage is seeded with a fixed high score. Sorting is stable, so
/// equal scores keep document order.
pub fn scored_candidates(html: &str, base: &Url) -> Vec<ScoredLink> {
    let doc = Html::parse_document(html);

    let mut candidates = vec![ScoredLink {
        url: base.clone(),
        score: HOME_SCORE,
        anchor_text: "Home".to_string(),
    }];

    for el in doc.select(&LINK_SELECTOR) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        resolved.set_fragment(None);

        if !matches!(resolved.scheme(), "http" | "https") || !same_site(base, &resolved) {
            continue;
        }

        let anchor_text: String = el.text().collect();
        let score = score_link(&anchor_text, &resolved);
        candidates.push(ScoredLink {
            url: resolved,
            score,
            anchor_text,
        });
    }

    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Walk candidates in rank order, filling the about and product slots.
pub fn assign_pages(base: &Url, candidates: &[ScoredLink]) -> SiteMap {
    let mut sitemap = SiteMap::home_only(base.clone());

    for link in candidates {
        let href = link.url.as_str().to_lowercase();
        let text = link.anchor_text.to_lowercase();

        if sitemap.about.is_none() && (href.contains("about") || text.contains("about")) {
            sitemap.about = Some(link.url.clone());
        } else if sitemap.product.is_none()
            && (href.contains("product") || text.contains("product"))
        {
            sitemap.product = Some(link.url.clone());
        }

        if sitemap.about.is_some() && sitemap.product.is_some() {
            break;
        }
    }

    sitemap
}

/// Hosts match, ignoring a leading `www.`.
fn same_site(base: &Url, candidate: &Url) -> bool {
    fn bare(url: &Url) -> Option<String> {
        url.host_str()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    }
    bare(base).is_some() && bare(base) == bare(candidate)
}

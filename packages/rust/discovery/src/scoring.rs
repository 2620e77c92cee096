//! Heuristic link scoring for page discovery.

use url::Url;

const ABOUT_KEYWORDS: [&str; 9] = [
    "about",
    "about us",
    "who we are",
    "our story",
    "mission",
    "vision",
    "values",
    "team",
    "company",
];

const PRODUCT_KEYWORDS: [&str; 5] = ["product", "products", "solutions", "services", "offerings"];

const AVOID_KEYWORDS: [&str; 7] = ["contact", "blog", "news", "careers", "jobs", "login", "sign"];

/// A candidate link with its heuristic score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredLink {
    pub url: Url,
    pub score: i32,
    pub anchor_text: String,
}

/// Score a link by how likely it is to be an about or product page.
///
/// Each about/product keyword adds 2 when found in the anchor text and 1 when
/// found in the href. Shallow paths get a bonus of 1. Any avoid keyword in
/// either the href or the text costs 2, once.
pub fn score_link(anchor_text: &str, href: &Url) -> i32 {
    let text = anchor_text.to_lowercase();
    let href_lower = href.as_str().to_lowercase();

    let mut score = 0;
    for keyword in ABOUT_KEYWORDS.iter().chain(PRODUCT_KEYWORDS.iter()) {
        if text.contains(keyword) {
            score += 2;
        }
        if href_lower.contains(keyword) {
            score += 1;
        }
    }

    if path_depth(href) <= 2 {
        score += 1;
    }

    if AVOID_KEYWORDS
        .iter()
        .any(|keyword| href_lower.contains(keyword) || text.contains(keyword))
    {
        score -= 2;
    }

    score
}

fn path_depth(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

//! Core domain types for classification.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClassificationError;

/// Sentinel for a value that is missing or could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel primary category for results a person must look at.
pub const NEEDS_FURTHER_REVIEW: &str = "NEEDS FURTHER REVIEW";

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Kind of page whose text is fed into classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Home,
    About,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::About => "about",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pages picked out of a site's homepage links.
///
/// `home` is always populated; `about` and `product` are set at most once
/// during a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteMap {
    pub home: Url,
    pub about: Option<Url>,
    pub product: Option<Url>,
}

impl SiteMap {
    /// A map with only the homepage, used whenever discovery cannot proceed.
    pub fn home_only(home: Url) -> Self {
        Self {
            home,
            about: None,
            product: None,
        }
    }

    /// URL to fetch for the given page type, if one was found.
    pub fn page(&self, page_type: PageType) -> Option<&Url> {
        match page_type {
            PageType::Home => Some(&self.home),
            PageType::About => self.about.as_ref(),
        }
    }
}

/// Outcome of fetching one page.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_type: PageType,
    /// Visible text, or the failure message when `success` is false.
    pub text: String,
    pub success: bool,
}

/// Where the acquired text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Website,
    WebSearch,
    /// Neither the site nor the search fallback produced text.
    None,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::WebSearch => "web_search",
            Self::None => NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text acquired for one business. Pages that failed to fetch are absent.
#[derive(Debug, Clone)]
pub struct WebsiteContent {
    pub pages: BTreeMap<PageType, String>,
    pub product_exists: bool,
    pub source: ContentSource,
}

impl WebsiteContent {
    /// Page text, or an empty string for a page that was not acquired.
    pub fn text(&self, page_type: PageType) -> &str {
        self.pages.get(&page_type).map(String::as_str).unwrap_or("")
    }

    pub fn has_content(&self) -> bool {
        self.source != ContentSource::None
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Keyword-filtered reduction of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDigest {
    pub summary: String,
    /// At most ten terms, most frequent first.
    pub top_keywords: Vec<String>,
}

/// Everything the request builder needs from the acquired content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub home: PageDigest,
    pub about: PageDigest,
    /// Top terms over home and about text together.
    pub combined_keywords: Vec<String>,
    pub product_exists: bool,
    pub source: ContentSource,
}

// ---------------------------------------------------------------------------
// Company profile
// ---------------------------------------------------------------------------

/// Customer metadata rendered into the prompt.
#[derive(Debug, Clone, Default)]
pub struct CompanyProfile {
    pub customer: String,
    pub city: String,
    pub country: String,
    pub state: String,
    pub web_address: String,
    /// Category already on file for this customer, if any.
    pub current_category: String,
}

// ---------------------------------------------------------------------------
// Classification result
// ---------------------------------------------------------------------------

/// Confidence level reported by the model, restricted to the accepted labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Confidence {
    /// Exact-match a label; anything outside the accepted set is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Self::High),
            "Medium" => Some(Self::Medium),
            "Low" => Some(Self::Low),
            NOT_AVAILABLE => Some(Self::NotAvailable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::NotAvailable => NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal, typed outcome of classifying one business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub primary_category: String,
    pub secondary_category: String,
    pub confidence: Confidence,
    pub explanation: String,
    pub confidence_justification: String,
    pub current_category_evaluation: String,
}

impl ClassificationResult {
    fn sentinel(primary: &str, explanation: String) -> Self {
        Self {
            primary_category: primary.to_string(),
            secondary_category: NOT_AVAILABLE.to_string(),
            confidence: Confidence::NotAvailable,
            explanation,
            confidence_justification: NOT_AVAILABLE.to_string(),
            current_category_evaluation: NOT_AVAILABLE.to_string(),
        }
    }

    /// The single conversion applied wherever an error reaches a component boundary.
    pub fn from_error(err: &ClassificationError) -> Self {
        Self::sentinel(NEEDS_FURTHER_REVIEW, format!("Error occurred: {err}"))
    }

    /// No URL could be found in the input.
    pub fn no_url(customer: Option<&str>) -> Self {
        let explanation = match customer {
            Some(c) => format!("NO URL FOUND for {c}"),
            None => "NO URL FOUND".to_string(),
        };
        Self::sentinel(NOT_AVAILABLE, explanation)
    }

    /// Neither the site nor the search fallback produced any text.
    pub fn no_content(customer: &str, url: &str) -> Self {
        Self::sentinel(
            "No Content",
            format!("Unable to retrieve content for {customer} (URL: {url})"),
        )
    }

    /// The generation service could not be reached or its stream broke.
    pub fn no_response(detail: &str) -> Self {
        Self::sentinel(
            NEEDS_FURTHER_REVIEW,
            format!("Error: Failed to get response from generation service ({detail})"),
        )
    }

    /// A batch row whose processing failed outright.
    pub fn row_error(customer: &str, url: &str, detail: &str) -> Self {
        Self::sentinel(
            "Error",
            format!("Error processing {customer} (URL: {url}): {detail}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_labels_are_exact() {
        assert_eq!(Confidence::from_label("High"), Some(Confidence::High));
        assert_eq!(Confidence::from_label("N/A"), Some(Confidence::NotAvailable));
        assert_eq!(Confidence::from_label("high"), None);
        assert_eq!(Confidence::from_label("Extreme"), None);
    }

    #[test]
    fn error_sentinel_shape() {
        let err = ClassificationError::Network("connection reset".into());
        let result = ClassificationResult::from_error(&err);
        assert_eq!(result.primary_category, NEEDS_FURTHER_REVIEW);
        assert_eq!(result.confidence, Confidence::NotAvailable);
        assert!(result.explanation.starts_with("Error occurred: "));
        assert!(result.explanation.contains("connection reset"));
    }

    #[test]
    fn no_url_sentinel_mentions_customer() {
        let result = ClassificationResult::no_url(Some("Acme Inc"));
        assert_eq!(result.primary_category, "N/A");
        assert_eq!(result.explanation, "NO URL FOUND for Acme Inc");
    }

    #[test]
    fn site_map_pages() {
        let home = Url::parse("https://example.com/").unwrap();
        let map = SiteMap::home_only(home.clone());
        assert_eq!(map.page(PageType::Home), Some(&home));
        assert_eq!(map.page(PageType::About), None);
    }

    #[test]
    fn missing_page_text_is_empty() {
        let mut pages = BTreeMap::new();
        pages.insert(PageType::Home, "We sell shoes.".to_string());
        let content = WebsiteContent {
            pages,
            product_exists: false,
            source: ContentSource::Website,
        };
        assert_eq!(content.text(PageType::Home), "We sell shoes.");
        assert_eq!(content.text(PageType::About), "");
        assert!(content.has_content());
    }
}

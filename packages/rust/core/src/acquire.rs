//! Content acquisition: discovery, concurrent page fetches, search fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};
use url::Url;

use categorizer_crawler::{fetch_page_text, is_failure_text, web_search};
use categorizer_discovery::find_pages;
use categorizer_shared::{
    ClassificationError, ContentSource, PageContent, PageType, Result, ScrapeConfig,
    WebsiteContent,
};

/// Pages fetched for every business, in fetch order.
const FETCHED_PAGES: [PageType; 2] = [PageType::Home, PageType::About];

/// Gathers the text a classification is based on. Cheap to clone.
#[derive(Clone)]
pub struct ContentAcquirer {
    client: Client,
    config: Arc<ScrapeConfig>,
}

impl ContentAcquirer {
    pub fn new(client: Client, config: ScrapeConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Acquire home and about text for `base`, falling back to a web search
    /// for `descriptor` when neither page yields anything.
    ///
    /// Individual page failures are absorbed; only a failed fetch task is an error.
    #[instrument(skip_all, fields(url = %base))]
    pub async fn acquire(&self, base: &Url, descriptor: &str) -> Result<WebsiteContent> {
        let sitemap = find_pages(&self.client, base, &self.config).await;
        let semaphore = Arc::new(Semaphore::new(self.config.fetch_concurrency));

        let mut handles = Vec::new();
        for page_type in FETCHED_PAGES {
            let Some(url) = sitemap.page(page_type).cloned() else {
                continue;
            };
            let client = self.client.clone();
            let config = self.config.clone();
            let sem = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.map_err(|e| {
                    ClassificationError::Network(format!("fetch pool closed: {e}"))
                })?;
                let text = fetch_page_text(&client, &url, &config).await;
                Ok::<_, ClassificationError>(PageContent {
                    page_type,
                    success: !is_failure_text(&text),
                    text,
                })
            }));
        }

        let mut pages = BTreeMap::new();
        for handle in handles {
            let page = handle.await.map_err(|e| {
                ClassificationError::Network(format!("page fetch task failed: {e}"))
            })??;

            if page.success {
                info!(page = %page.page_type, chars = page.text.len(), "page content acquired");
                pages.insert(page.page_type, page.text);
            } else {
                warn!(page = %page.page_type, detail = %page.text, "page content unavailable");
            }
        }

        let product_exists = sitemap.product.is_some();

        if !pages.is_empty() {
            return Ok(WebsiteContent {
                pages,
                product_exists,
                source: ContentSource::Website,
            });
        }

        info!("no page content, falling back to web search");
        let results = web_search(&self.client, descriptor, &self.config).await;
        let source = if results.is_empty() {
            warn!("web search fallback found nothing");
            ContentSource::None
        } else {
            pages.insert(PageType::Home, results);
            ContentSource::WebSearch
        };

        Ok(WebsiteContent {
            pages,
            product_exists,
            source,
        })
    }
}

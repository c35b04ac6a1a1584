pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::CompanyRecord;
use crate::session::CookieBundle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use self::http_client::HttpClient;
use self::parsers::parse_results_page;

// ── Source trait ──────────────────────────────────────────────────────────────

/// One page's worth of authenticated fetching and extraction.
///
/// Swappable so the scheduler can be exercised without a network; the
/// real implementation is [`ScreenerScraper`].
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn scrape_page(&self, page: u32) -> Result<Vec<CompanyRecord>>;
}

// ── screener.in scraper ───────────────────────────────────────────────────────

pub struct ScreenerScraper {
    client: HttpClient,
    base_url: String,
    settle: Duration,
}

impl ScreenerScraper {
    pub fn new(config: &ScraperConfig, bundle: &CookieBundle) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config, bundle)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            settle: Duration::from_secs(config.settle_secs),
        })
    }

    /// URL for a 1-based listing page. Page 1 is the bare listing URL.
    fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}/", self.base_url)
        } else {
            format!("{}/?p={}", self.base_url, page)
        }
    }

    /// Fetch one page's markup. The settle wait gives the site's
    /// client-rendered tables time to materialize; extracting earlier
    /// silently yields empty pages, so this is a correctness wait.
    async fn fetch_page(&self, page: u32) -> Result<String> {
        let url = self.page_url(page);
        info!("Fetching page {} ({})", page, url);

        let html = self
            .client
            .get_text(&url)
            .await
            .with_context(|| format!("Failed to fetch listing page {}", page))?;

        tokio::time::sleep(self.settle).await;
        Ok(html)
    }
}

#[async_trait]
impl PageSource for ScreenerScraper {
    async fn scrape_page(&self, page: u32) -> Result<Vec<CompanyRecord>> {
        let html = self.fetch_page(page).await?;
        let records = parse_results_page(&html);
        debug!("Page {}: {} companies", page, records.len());
        Ok(records)
    }
}

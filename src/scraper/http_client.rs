use crate::config::ScraperConfig;
use crate::session::CookieBundle;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One authenticated fetch context.
///
/// Never shared across workers: concurrent use of one context is unsafe,
/// so every worker builds its own client from the same read-only cookie
/// bundle.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig, bundle: &CookieBundle) -> Result<Self> {
        let jar = Arc::new(bundle.to_jar()?);

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .cookie_provider(jar)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { inner })
    }

    /// Fetch a URL as text. Rate-limit responses (429/503) are reported
    /// as errors like any other failure; the scheduler owns the penalty
    /// back-off and decides when the next page goes out.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.as_u16() == 503 {
            warn!("Rate limited ({}) on {}", status, url);
            anyhow::bail!("rate limited: HTTP {}", status);
        }
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}", status, url);
        }

        resp.text().await.context("Failed to read response body")
    }

    /// Fetch a URL following redirects, returning the final URL together
    /// with the body. The login check needs both: the site answers an
    /// expired session with a redirect to its login/register pages.
    pub async fn get_with_final_url(&self, url: &str) -> Result<(String, String)> {
        debug!("GET {} (login check)", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed for {}", url))?;

        let final_url = resp.url().to_string();
        let body = resp.text().await.context("Failed to read response body")?;
        Ok((final_url, body))
    }
}

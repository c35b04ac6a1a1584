//! Cookie-bundle persistence and the live login check.
//!
//! Interactive login is an external, human-in-the-loop step (a browser
//! helper that writes a JSON cookie bundle). This module only consumes
//! its output contract: a bundle file that `verify` accepts.

use crate::config::AppConfig;
use crate::models::CookieRecord;
use crate::scraper::http_client::HttpClient;
use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

// ── Cookie bundle ─────────────────────────────────────────────────────────────

/// The saved authentication state. Opaque beyond present/absent and
/// valid/invalid; the internal schema is whatever the login helper wrote.
#[derive(Debug, Clone)]
pub struct CookieBundle {
    cookies: Vec<CookieRecord>,
}

impl CookieBundle {
    pub fn read_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read cookie bundle {:?}", path))?;
        let cookies: Vec<CookieRecord> =
            serde_json::from_str(&raw).context("Cookie bundle is not valid JSON")?;
        Ok(Self { cookies })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.cookies)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Could not write cookie bundle {:?}", path))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Load every cookie into a fresh reqwest jar. Each worker calls
    /// this on its own client; the bundle itself stays read-only.
    pub fn to_jar(&self) -> Result<Jar> {
        let jar = Jar::default();
        for c in &self.cookies {
            let origin: Url = format!("https://{}/", c.domain.trim_start_matches('.'))
                .parse()
                .with_context(|| format!("Bad cookie domain {:?}", c.domain))?;

            let mut header = format!(
                "{}={}; Domain={}; Path={}",
                c.name, c.value, c.domain, c.path
            );
            if c.secure {
                header.push_str("; Secure");
            }
            jar.add_cookie_str(&header, &origin);
        }
        Ok(jar)
    }

    #[cfg(test)]
    pub fn from_records(cookies: Vec<CookieRecord>) -> Self {
        Self { cookies }
    }
}

// ── Session manager ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Unverified,
    Verified,
    Invalid,
}

pub struct SessionManager {
    config: AppConfig,
    cookies_path: PathBuf,
    state: SessionState,
}

impl SessionManager {
    pub fn new(config: &AppConfig) -> Self {
        let cookies_path = config.session.cookies_path.clone();
        let state = if cookies_path.exists() {
            SessionState::Unverified
        } else {
            SessionState::NoSession
        };
        Self {
            config: config.clone(),
            cookies_path,
            state,
        }
    }

    pub fn has_persisted_session(&self) -> bool {
        self.cookies_path.exists()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn load(&self) -> Result<CookieBundle> {
        CookieBundle::read_from(&self.cookies_path)
    }

    /// Install a bundle produced by the external login helper. A fresh
    /// bundle moves an `Invalid` session back to `Unverified`.
    pub fn import(&mut self, source: &Path) -> Result<usize> {
        let bundle = CookieBundle::read_from(source)?;
        if bundle.is_empty() {
            anyhow::bail!("bundle {:?} contains no cookies", source);
        }
        bundle.write_to(&self.cookies_path)?;
        self.state = SessionState::Unverified;
        info!("Imported {} cookies to {:?}", bundle.len(), self.cookies_path);
        Ok(bundle.len())
    }

    /// Live login check: load the bundle into a fresh context, fetch the
    /// authenticated listing, and look for evidence either way.
    pub async fn verify(&mut self, bundle: &CookieBundle) -> Result<bool> {
        let client = HttpClient::new(&self.config.scraper, bundle)?;
        let (final_url, body) = client
            .get_with_final_url(&self.config.scraper.base_url)
            .await
            .context("Login check request failed")?;

        let ok = judge_login_response(&final_url, &body);
        self.state = if ok {
            SessionState::Verified
        } else {
            SessionState::Invalid
        };
        Ok(ok)
    }
}

/// A redirect to the login/register pages means the session was
/// rejected; a results table means we are in. Absence of both signals
/// fails closed.
pub fn judge_login_response(final_url: &str, body: &str) -> bool {
    if final_url.contains("/login/") || final_url.contains("/register/") {
        return false;
    }

    let doc = Html::parse_document(body);
    let Ok(sel) = Selector::parse("table.data-table") else {
        return false;
    };
    doc.select(&sel).next().is_some()
}

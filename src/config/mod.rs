use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
}

/// Fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wait after each fetch so client-rendered tables finish
    /// materializing before extraction. Not an optimization knob.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,
}

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Extended sleep after a failed page before moving on.
    #[serde(default = "default_penalty_secs")]
    pub penalty_secs: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Upper bound of the "all pages" default selection.
    #[serde(default = "default_max_page")]
    pub max_page: u32,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://www.screener.in/results/latest".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_settle_secs() -> u64 {
    8
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_cookies_path() -> PathBuf {
    PathBuf::from("screener_cookies.json")
}
fn default_workers() -> usize {
    1
}
fn default_delay_secs() -> u64 {
    5
}
fn default_penalty_secs() -> u64 {
    10
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_page() -> u32 {
    80
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("SCREENER").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                base_url: default_base_url(),
                timeout_secs: default_timeout_secs(),
                settle_secs: default_settle_secs(),
                user_agent: default_user_agent(),
            },
            session: SessionConfig {
                cookies_path: default_cookies_path(),
            },
            scheduler: SchedulerConfig {
                workers: default_workers(),
                delay_secs: default_delay_secs(),
                penalty_secs: default_penalty_secs(),
                jitter_ms: default_jitter_ms(),
                max_page: default_max_page(),
            },
        }
    }
}

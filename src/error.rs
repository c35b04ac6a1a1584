use thiserror::Error;

/// Failure categories that block a whole scrape run.
///
/// Per-page fetch failures and per-company parse failures are absorbed
/// inside the scheduler and extractor; they only reduce completeness of
/// the result and are reported through logs.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no saved session — run the login helper, then `qscreener import-cookies`")]
    NoSession,

    #[error("session rejected by the site — cookies are expired or invalid; re-run the login helper and import a fresh bundle")]
    SessionInvalid,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("all {0} workers failed — no pages could be scraped")]
    AllWorkersFailed(usize),
}

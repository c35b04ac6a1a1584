use serde::{Deserialize, Serialize};

// ── Company quarterly snapshot ────────────────────────────────────────────────

/// One company's latest-quarter results as shown on the listing page.
///
/// Every numeric field is either a finite value or absent — the source
/// leaves cells blank for unreported figures and that must never be
/// conflated with zero. `company` is always non-empty; the extractor
/// drops tables it cannot attribute to a company.
///
/// The three period values per metric correspond to the listing's column
/// order: latest quarter, the quarter before it, and the same quarter a
/// year ago.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company: String,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe: Option<f64>,

    pub sales_yoy: Option<f64>,
    pub sales_latest: Option<f64>,
    pub sales_prior_qtr: Option<f64>,
    pub sales_year_ago: Option<f64>,

    pub ebidt_yoy: Option<f64>,
    pub ebidt_latest: Option<f64>,
    pub ebidt_prior_qtr: Option<f64>,
    pub ebidt_year_ago: Option<f64>,

    pub net_profit_yoy: Option<f64>,
    pub net_profit_latest: Option<f64>,
    pub net_profit_prior_qtr: Option<f64>,
    pub net_profit_year_ago: Option<f64>,

    pub eps_yoy: Option<f64>,
    pub eps_latest: Option<f64>,
    pub eps_prior_qtr: Option<f64>,
    pub eps_year_ago: Option<f64>,
}

// ── Saved cookies ─────────────────────────────────────────────────────────────

/// One browser cookie as serialized by the external login helper.
///
/// The schema mirrors what browser automation exports; fields we don't
/// need for replay (httpOnly, sameSite, …) are ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub expiry: Option<f64>,
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

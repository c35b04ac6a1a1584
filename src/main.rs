mod config;
mod error;
mod export;
mod models;
mod scheduler;
mod scraper;
mod session;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::error::ScrapeError;
use crate::scheduler::{Scheduler, SourceFactory};
use crate::scraper::{PageSource, ScreenerScraper};
use crate::session::SessionManager;

#[derive(Parser)]
#[command(name = "qscreener", about = "Quarterly results scraper for screener.in", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape quarterly results pages and export them as CSV
    Scrape {
        /// Pages to fetch, e.g. "1,5,10-15" (default: every listing page)
        #[arg(short, long)]
        pages: Option<String>,

        /// Parallel workers, each with its own authenticated context
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        workers: Option<u8>,

        /// Delay between page requests, in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
        delay: Option<u8>,

        /// Output CSV path (default: quarterly_results_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether the saved cookie bundle still logs in
    Verify,

    /// Install a cookie bundle produced by the external login helper
    ImportCookies {
        /// Path to the JSON bundle
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "qscreener=info,warn",
        1 => "qscreener=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape { pages, workers, delay, output } => {
            let _t = utils::Timer::start("Scrape run");

            // Input validation happens before any network activity.
            let page_list = match pages {
                Some(spec) => utils::parse_page_spec(&spec)?,
                None => (1..=config.scheduler.max_page).collect(),
            };

            let mut scheduler_cfg = config.scheduler.clone();
            if let Some(w) = workers {
                scheduler_cfg.workers = usize::from(w);
            }
            if let Some(d) = delay {
                scheduler_cfg.delay_secs = u64::from(d);
            }

            // Fail closed on authentication before dispatching anything.
            let mut session = SessionManager::new(&config);
            if !session.has_persisted_session() {
                return Err(ScrapeError::NoSession.into());
            }
            let bundle = Arc::new(session.load()?);
            info!("Verifying saved session…");
            if !session.verify(&bundle).await? {
                return Err(ScrapeError::SessionInvalid.into());
            }
            info!("Session verified — logged in.");

            let scraper_cfg = config.scraper.clone();
            let factory: Arc<SourceFactory> = Arc::new(move || {
                let source = ScreenerScraper::new(&scraper_cfg, &bundle)?;
                Ok(Box::new(source) as Box<dyn PageSource>)
            });

            let scheduler = Scheduler::new(factory, &scheduler_cfg)?;
            let outcome = scheduler
                .scrape(
                    &page_list,
                    Arc::new(|done, total| info!("Progress: {}/{} pages", done, total)),
                )
                .await?;

            let out_path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "quarterly_results_{}.csv",
                    chrono::Utc::now().format("%Y-%m-%d")
                ))
            });
            export::write_csv_file(&outcome.records, &out_path)?;

            println!("─────────────────────────────────");
            println!("  Quarterly Results — Run Summary");
            println!("─────────────────────────────────");
            println!("  Pages     : {}", utils::fmt_number(page_list.len() as i64));
            println!("  Companies : {}", utils::fmt_number(outcome.records.len() as i64));
            println!("  Failed    : {} pages, {} workers", outcome.pages_failed, outcome.workers_failed);
            println!("  Output    : {}", out_path.display());
            println!("─────────────────────────────────");
        }

        Command::Verify => {
            let mut session = SessionManager::new(&config);
            if !session.has_persisted_session() {
                println!("No saved session. Run the login helper, then `qscreener import-cookies`.");
                return Ok(());
            }
            let bundle = session.load()?;
            session.verify(&bundle).await?;
            match session.state() {
                session::SessionState::Verified => println!("Session valid — logged in."),
                _ => println!(
                    "Session rejected — cookies are expired. Re-run the login helper and import a fresh bundle."
                ),
            }
        }

        Command::ImportCookies { path } => {
            let mut session = SessionManager::new(&config);
            let n = session.import(&path)?;
            println!("Imported {} cookies to {:?}.", n, config.session.cookies_path);
            println!("Run `qscreener verify` to confirm the login works.");
        }
    }

    Ok(())
}

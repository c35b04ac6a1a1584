//! Scrape scheduler: partitions a page set across a bounded worker pool.
//!
//! Each worker is a long-lived task owning its own authenticated fetch
//! context and a static, contiguous chunk of the sorted page list — no
//! work stealing. The single-worker run is the same routine with one
//! chunk. Per-page failures cost a penalty sleep and are never retried
//! within a run; a dead worker only removes its own contribution.

use crate::config::SchedulerConfig;
use crate::error::ScrapeError;
use crate::models::CompanyRecord;
use crate::scraper::PageSource;
use anyhow::Result;
use rand::Rng;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub const MAX_WORKERS: usize = 5;
pub const MIN_DELAY_SECS: u64 = 1;
pub const MAX_DELAY_SECS: u64 = 10;

/// Builds one independently authenticated fetch context per worker.
/// Contexts must never be shared, so the scheduler takes a factory
/// rather than a source.
pub type SourceFactory = dyn Fn() -> Result<Box<dyn PageSource>> + Send + Sync;

/// Invoked with `(pages_completed_so_far, total_pages)` after every
/// successfully scraped page, serialized under the progress lock.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

#[derive(Debug, Default)]
pub struct ScrapeOutcome {
    pub records: Vec<CompanyRecord>,
    pub pages_failed: usize,
    pub workers_failed: usize,
}

pub struct Scheduler {
    make_source: Arc<SourceFactory>,
    workers: usize,
    delay_secs: u64,
    penalty_secs: u64,
    jitter_ms: u64,
}

impl Scheduler {
    pub fn new(make_source: Arc<SourceFactory>, config: &SchedulerConfig) -> Result<Self, ScrapeError> {
        if !(1..=MAX_WORKERS).contains(&config.workers) {
            return Err(ScrapeError::InvalidInput(format!(
                "workers must be 1..={}, got {}",
                MAX_WORKERS, config.workers
            )));
        }
        if !(MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&config.delay_secs) {
            return Err(ScrapeError::InvalidInput(format!(
                "delay must be {}..={} seconds, got {}",
                MIN_DELAY_SECS, MAX_DELAY_SECS, config.delay_secs
            )));
        }
        Ok(Self {
            make_source,
            workers: config.workers,
            delay_secs: config.delay_secs,
            penalty_secs: config.penalty_secs,
            jitter_ms: config.jitter_ms,
        })
    }

    /// Scrape the given pages and return the union of all workers'
    /// records. Record order follows completion order, not page order,
    /// when more than one worker runs.
    pub async fn scrape(
        &self,
        pages: &[u32],
        on_progress: Arc<ProgressFn>,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let pages = normalize_pages(pages);
        if pages.is_empty() {
            return Ok(ScrapeOutcome::default());
        }

        let total = pages.len();
        let chunks = partition_chunks(&pages, self.workers);
        let completed = Arc::new(Mutex::new(0usize));

        info!(
            "Scraping {} pages with {} worker(s), {}s delay",
            total, self.workers, self.delay_secs
        );

        let mut handles = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if chunk.is_empty() {
                continue;
            }
            let worker_id = i + 1;
            let make_source = Arc::clone(&self.make_source);
            let completed = Arc::clone(&completed);
            let on_progress = Arc::clone(&on_progress);
            let delay_secs = self.delay_secs;
            let penalty_secs = self.penalty_secs;
            let jitter_ms = self.jitter_ms;

            let handle = tokio::spawn(async move {
                let source = (*make_source)()?;
                info!("[worker {}] {} pages: {:?}…", worker_id, chunk.len(), &chunk[..chunk.len().min(5)]);
                Ok::<_, anyhow::Error>(
                    run_worker(
                        worker_id,
                        source.as_ref(),
                        &chunk,
                        total,
                        &completed,
                        on_progress.as_ref(),
                        delay_secs,
                        penalty_secs,
                        jitter_ms,
                    )
                    .await,
                )
            });

            handles.push((worker_id, handle));
        }

        let spawned = handles.len();
        let mut outcome = ScrapeOutcome::default();

        for (worker_id, handle) in handles {
            match handle.await {
                Ok(Ok((records, failed))) => {
                    outcome.records.extend(records);
                    outcome.pages_failed += failed;
                }
                Ok(Err(e)) => {
                    warn!("[worker {}] failed: {:#}", worker_id, e);
                    outcome.workers_failed += 1;
                }
                Err(e) => {
                    error!("[worker {}] task panic: {}", worker_id, e);
                    outcome.workers_failed += 1;
                }
            }
        }

        if spawned > 0 && outcome.workers_failed == spawned {
            return Err(ScrapeError::AllWorkersFailed(spawned));
        }

        info!(
            "Run complete: {} records, {} pages failed, {} workers failed",
            outcome.records.len(),
            outcome.pages_failed,
            outcome.workers_failed
        );
        Ok(outcome)
    }
}

/// Process one chunk in ascending order. A failed page is logged, costs
/// the penalty sleep, and is skipped for the rest of the run.
#[allow(clippy::too_many_arguments)]
async fn run_worker(
    worker_id: usize,
    source: &dyn PageSource,
    chunk: &[u32],
    total: usize,
    completed: &Mutex<usize>,
    on_progress: &ProgressFn,
    delay_secs: u64,
    penalty_secs: u64,
    jitter_ms: u64,
) -> (Vec<CompanyRecord>, usize) {
    let mut records = Vec::new();
    let mut failed = 0usize;

    for &page in chunk {
        match source.scrape_page(page).await {
            Ok(batch) => {
                info!("[worker {}] page {}: {} companies", worker_id, page, batch.len());
                records.extend(batch);

                // Holding the lock across the callback keeps the
                // reported count accurate and monotonic.
                if let Ok(mut done) = completed.lock() {
                    *done += 1;
                    on_progress(*done, total);
                }

                polite_delay(delay_secs, jitter_ms).await;
            }
            Err(e) => {
                warn!("[worker {}] page {} failed: {:#}", worker_id, page, e);
                failed += 1;
                sleep(Duration::from_secs(penalty_secs)).await;
            }
        }
    }

    (records, failed)
}

/// Inter-request delay plus random jitter so workers don't fall into
/// lockstep against the site.
async fn polite_delay(delay_secs: u64, jitter_ms: u64) {
    let jitter = rand::rng().random_range(0..=jitter_ms);
    sleep(Duration::from_millis(delay_secs * 1000 + jitter)).await;
}

/// Deduplicate and ascending-sort the caller's page set before dispatch.
fn normalize_pages(pages: &[u32]) -> Vec<u32> {
    pages.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Split the sorted page list into `workers` contiguous chunks with
/// sizes differing by at most one, remainder going to the earliest
/// chunks. Chunks may be empty when there are more workers than pages.
fn partition_chunks(pages: &[u32], workers: usize) -> Vec<Vec<u32>> {
    let workers = workers.max(1);
    let base = pages.len() / workers;
    let remainder = pages.len() % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < remainder);
        chunks.push(pages[start..start + size].to_vec());
        start += size;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config(workers: usize) -> SchedulerConfig {
        SchedulerConfig {
            workers,
            delay_secs: 1,
            penalty_secs: 1,
            jitter_ms: 0,
            max_page: 80,
        }
    }

    struct FakeSource {
        fail_pages: HashSet<u32>,
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn scrape_page(&self, page: u32) -> Result<Vec<CompanyRecord>> {
            if self.fail_pages.contains(&page) {
                anyhow::bail!("fetch context died on page {}", page);
            }
            Ok(vec![CompanyRecord {
                company: format!("page-{}", page),
                ..Default::default()
            }])
        }
    }

    fn fake_factory(fail_pages: &[u32]) -> Arc<SourceFactory> {
        let fail_pages: HashSet<u32> = fail_pages.iter().copied().collect();
        Arc::new(move || {
            Ok(Box::new(FakeSource {
                fail_pages: fail_pages.clone(),
            }) as Box<dyn PageSource>)
        })
    }

    fn no_progress() -> Arc<ProgressFn> {
        Arc::new(|_, _| {})
    }

    #[test]
    fn partition_ten_pages_three_workers() {
        let pages: Vec<u32> = (1..=10).collect();
        let chunks = partition_chunks(&pages, 3);

        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        let rejoined: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(rejoined, pages);
    }

    #[test]
    fn partition_with_more_workers_than_pages() {
        let pages = vec![1, 2, 3];
        let chunks = partition_chunks(&pages, 5);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1, 1, 1, 0, 0]);
        let rejoined: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(rejoined, pages);
    }

    #[test]
    fn pages_are_deduplicated_and_sorted_before_dispatch() {
        assert_eq!(normalize_pages(&[5, 1, 5, 3, 1]), vec![1, 3, 5]);
    }

    #[test]
    fn out_of_range_bounds_are_rejected() {
        let factory = fake_factory(&[]);
        assert!(matches!(
            Scheduler::new(Arc::clone(&factory), &SchedulerConfig { workers: 0, ..test_config(1) }),
            Err(ScrapeError::InvalidInput(_))
        ));
        assert!(matches!(
            Scheduler::new(Arc::clone(&factory), &SchedulerConfig { workers: 6, ..test_config(1) }),
            Err(ScrapeError::InvalidInput(_))
        ));
        assert!(matches!(
            Scheduler::new(factory, &SchedulerConfig { delay_secs: 0, ..test_config(1) }),
            Err(ScrapeError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_page_set_is_an_empty_result() {
        let scheduler = Scheduler::new(fake_factory(&[]), &test_config(2)).unwrap();
        let outcome = tokio_test::block_on(scheduler.scrape(&[], no_progress())).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.pages_failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn all_workers_contribute_to_the_union() {
        let scheduler = Scheduler::new(fake_factory(&[]), &test_config(2)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let progress: Arc<ProgressFn> = Arc::new(move |done, total| {
            seen_cb.lock().unwrap().push((done, total));
        });

        let outcome = scheduler.scrape(&[1, 2, 3, 4], progress).await.unwrap();

        let mut companies: Vec<String> =
            outcome.records.iter().map(|r| r.company.clone()).collect();
        companies.sort();
        assert_eq!(companies, vec!["page-1", "page-2", "page-3", "page-4"]);
        assert_eq!(outcome.pages_failed, 0);
        assert_eq!(outcome.workers_failed, 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&(4, 4)));
        let counts: Vec<usize> = seen.iter().map(|(done, _)| *done).collect();
        assert_eq!(counts, vec![1, 2, 3, 4], "progress must be monotonic");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pages_on_one_chunk_leave_the_rest_intact() {
        // Two workers over 1..=4: chunk two is {3, 4}, and both of its
        // pages die. The run still succeeds with chunk one's records.
        let scheduler = Scheduler::new(fake_factory(&[3, 4]), &test_config(2)).unwrap();
        let outcome = scheduler.scrape(&[1, 2, 3, 4], no_progress()).await.unwrap();

        let mut companies: Vec<String> =
            outcome.records.iter().map(|r| r.company.clone()).collect();
        companies.sort();
        assert_eq!(companies, vec!["page-1", "page-2"]);
        assert_eq!(outcome.pages_failed, 2);
        assert_eq!(outcome.workers_failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_worker_context_spares_its_siblings() {
        // First context construction fails outright; the other worker's
        // partial result is still returned.
        let built = Arc::new(AtomicUsize::new(0));
        let built_in_factory = Arc::clone(&built);
        let factory: Arc<SourceFactory> = Arc::new(move || {
            if built_in_factory.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("browser context failed to start");
            }
            Ok(Box::new(FakeSource {
                fail_pages: HashSet::new(),
            }) as Box<dyn PageSource>)
        });

        let scheduler = Scheduler::new(factory, &test_config(2)).unwrap();
        let outcome = scheduler.scrape(&[1, 2, 3, 4], no_progress()).await.unwrap();

        assert_eq!(outcome.workers_failed, 1);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_fails_only_when_every_worker_fails() {
        let factory: Arc<SourceFactory> =
            Arc::new(|| anyhow::bail!("no contexts available"));
        let scheduler = Scheduler::new(factory, &test_config(2)).unwrap();

        let err = scheduler.scrape(&[1, 2, 3, 4], no_progress()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::AllWorkersFailed(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_pages_are_scraped_once() {
        let scheduler = Scheduler::new(fake_factory(&[]), &test_config(1)).unwrap();
        let outcome = scheduler.scrape(&[2, 1, 2, 1], no_progress()).await.unwrap();

        let companies: Vec<String> =
            outcome.records.iter().map(|r| r.company.clone()).collect();
        assert_eq!(companies, vec!["page-1", "page-2"]);
    }
}

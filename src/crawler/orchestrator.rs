//! Pagination loop — listing fetch, per-page pipeline spawn, page barrier
//!
//! The orchestrator preserves per-repository failure isolation: a `Failed`
//! pipeline is surfaced as a diagnostic but never stops the crawl. Only the
//! listing mechanism itself breaking (transport error or malformed listing
//! markup) terminates the loop.

use super::RepoCrawler;
use super::pipeline::{JobOutcome, crawl_repo};
use crate::error::Result;
use crate::types::{Event, JobState};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Terminal-state counts for one listing page
#[derive(Default)]
struct PageTally {
    published: usize,
    skipped: usize,
    failed: usize,
    first_failure: Option<JobOutcome>,
}

impl PageTally {
    fn record(&mut self, result: std::result::Result<JobOutcome, tokio::task::JoinError>) {
        match result {
            Ok(outcome) => match outcome.state {
                JobState::Published => self.published += 1,
                JobState::Skipped => self.skipped += 1,
                _ => {
                    self.failed += 1;
                    if self.first_failure.is_none() {
                        self.first_failure = Some(outcome);
                    }
                }
            },
            Err(join_error) => {
                error!(error = %join_error, "pipeline task aborted unexpectedly");
                self.failed += 1;
            }
        }
    }
}

enum BarrierExit {
    Drained,
    Cancelled,
}

pub(crate) async fn run(crawler: &RepoCrawler) -> Result<()> {
    let mut page_url = crawler.start_url.clone();

    loop {
        if crawler.cancel.is_cancelled() {
            info!("shutdown requested; exiting crawl loop");
            let _ = crawler.event_tx.send(Event::Shutdown);
            return Ok(());
        }

        // 1. listing fetch: unbounded retry policy, interruptible.
        // Transport errors propagate and terminate the crawl.
        let body = tokio::select! {
            result = crawler.fetcher.fetch_unbounded(&page_url) => result?,
            _ = crawler.cancel.cancelled() => {
                info!("shutdown requested while fetching listing; exiting");
                let _ = crawler.event_tx.send(Event::Shutdown);
                return Ok(());
            }
        };

        // 2. parse — a failure here is fatal; there is no isolation at the
        // pagination level
        let text = String::from_utf8_lossy(&body);
        let page = crawler.parser.parse_listing(&page_url, &text)?;

        // 3. deny-list filter
        let deny = crawler.config.deny_list();
        let references: Vec<_> = page
            .references
            .into_iter()
            .filter(|reference| {
                let denied = deny.iter().any(|d| d == reference.as_str());
                if denied {
                    info!(reference = %reference, "deny-listed; not crawling");
                }
                !denied
            })
            .collect();

        info!(url = %page_url, count = references.len(), "crawling listing page");

        // 4. one pipeline task per reference, spawn count unbounded — only
        // the download phase is throttled
        let mut tasks = JoinSet::new();
        for reference in references {
            let crawler = crawler.clone();
            tasks.spawn(async move { crawl_repo(&crawler, reference).await });
        }

        // 5. page barrier: do not advance until every pipeline reached a
        // terminal state or the page timeout fired
        let mut tally = PageTally::default();
        let barrier = tokio::time::timeout(
            crawler.config.page_timeout,
            drain_or_cancel(crawler, &mut tasks, &mut tally),
        )
        .await;
        match barrier {
            Ok(BarrierExit::Drained) => {
                info!(
                    published = tally.published,
                    skipped = tally.skipped,
                    failed = tally.failed,
                    "completed listing page"
                );
            }
            Ok(BarrierExit::Cancelled) => {
                info!(
                    outstanding = tasks.len(),
                    "shutdown requested; waiting for outstanding pipelines"
                );
                let grace = tokio::time::timeout(
                    crawler.config.shutdown_grace,
                    drain(&mut tasks, &mut tally),
                )
                .await;
                if grace.is_err() {
                    warn!(
                        outstanding = tasks.len(),
                        "grace period elapsed; abandoning outstanding pipelines"
                    );
                    tasks.detach_all();
                }
                let _ = crawler.event_tx.send(Event::Shutdown);
                return Ok(());
            }
            Err(_) => {
                // stragglers keep running detached: they publish or clean up
                // their own locks, and aborting mid-download would strand
                // staging directories
                warn!(
                    outstanding = tasks.len(),
                    "page timeout elapsed; detaching unfinished pipelines"
                );
                tasks.detach_all();
            }
        }

        if let Some(failure) = &tally.first_failure {
            let reason = failure
                .error
                .as_ref()
                .map_or_else(|| "unknown failure".to_string(), ToString::to_string);
            error!(reference = %failure.reference, %reason, "page had failures; continuing");
        }
        let _ = crawler.event_tx.send(Event::PageCompleted {
            published: tally.published,
            skipped: tally.skipped,
            failed: tally.failed,
        });

        // 6. advance; pagination is assumed unbounded
        page_url = page.next_page;
    }
}

/// Drain pipeline results until the set is empty or shutdown is requested.
/// Pipelines observe the cancellation token themselves; this only decides
/// when the orchestrator stops waiting at the barrier.
async fn drain_or_cancel(
    crawler: &RepoCrawler,
    tasks: &mut JoinSet<JobOutcome>,
    tally: &mut PageTally,
) -> BarrierExit {
    loop {
        tokio::select! {
            next = tasks.join_next() => match next {
                Some(result) => tally.record(result),
                None => return BarrierExit::Drained,
            },
            _ = crawler.cancel.cancelled() => return BarrierExit::Cancelled,
        }
    }
}

async fn drain(tasks: &mut JoinSet<JobOutcome>, tally: &mut PageTally) {
    while let Some(result) = tasks.join_next().await {
        tally.record(result);
    }
}

//! Per-repository crawl state machine
//!
//! One pipeline instance per discovered reference, driven to a terminal
//! state without self-retry; the orchestrator's next pagination cycle is
//! the only retry mechanism for abandoned jobs. Failures after lock
//! acquisition always remove the lock/staging directory, so no partial
//! destination is ever observable.

use crate::error::{Error, Result};
use crate::extract::SafeZipExtractor;
use crate::types::{Event, JobState, RepoReference};
use tracing::{error, info, warn};
use url::Url;

use super::RepoCrawler;

/// Ephemeral per-reference state, owned exclusively by one pipeline run
struct CrawlJob {
    reference: RepoReference,
    state: JobState,
}

/// What one pipeline run reported back to the orchestrator
pub(crate) struct JobOutcome {
    /// The reference the pipeline processed
    pub(crate) reference: RepoReference,
    /// Terminal state the job reached
    pub(crate) state: JobState,
    /// The error that caused a `Failed` state, if any
    pub(crate) error: Option<Error>,
}

/// Run the lock → resolve → download → extract → publish machine for one
/// reference. Always returns a terminal state; never propagates.
pub(crate) async fn crawl_repo(crawler: &RepoCrawler, reference: RepoReference) -> JobOutcome {
    let mut job = CrawlJob {
        reference,
        state: JobState::Pending,
    };

    // AcquireLock: contention (or any mkdir failure) is an immediate skip,
    // with no waiting and no retry
    match crawler.locks.try_acquire(&job.reference) {
        Ok(true) => job.state = JobState::LockHeld,
        Ok(false) => {
            info!(reference = %job.reference, "lock already held; skipping");
            return skipped(crawler, job);
        }
        Err(e) => {
            warn!(reference = %job.reference, error = %e, "could not create lock directory; skipping");
            return skipped(crawler, job);
        }
    }

    // CheckExisting: an already-published reference releases the lock and
    // walks away without touching the network
    if crawler.locks.exists(&job.reference) {
        info!(reference = %job.reference, "destination exists; skipping");
        if let Err(e) = crawler.locks.abandon(&job.reference) {
            warn!(reference = %job.reference, error = %e, "failed to release lock after skip");
        }
        return skipped(crawler, job);
    }

    match run_locked(crawler, &mut job).await {
        Ok(()) => {
            job.state = JobState::Published;
            info!(reference = %job.reference, "published");
            let _ = crawler.event_tx.send(Event::Published {
                reference: job.reference.clone(),
            });
            JobOutcome {
                reference: job.reference,
                state: JobState::Published,
                error: None,
            }
        }
        Err(e) => {
            // staging is removed before the failure is reported, so the
            // destination-exists invariant holds for every observer
            if let Err(cleanup) = crawler.locks.abandon(&job.reference) {
                warn!(reference = %job.reference, error = %cleanup, "lock cleanup failed");
            }
            let phase = job.state;
            job.state = JobState::Failed;
            match &e {
                Error::Cancelled => {
                    info!(reference = %job.reference, phase = ?phase, "cancelled; abandoning")
                }
                _ => {
                    error!(reference = %job.reference, phase = ?phase, error = %e, "crawl failed; abandoning")
                }
            }
            let _ = crawler.event_tx.send(Event::Failed {
                reference: job.reference.clone(),
                reason: e.to_string(),
            });
            JobOutcome {
                reference: job.reference,
                state: JobState::Failed,
                error: Some(e),
            }
        }
    }
}

fn skipped(crawler: &RepoCrawler, mut job: CrawlJob) -> JobOutcome {
    job.state = JobState::Skipped;
    let _ = crawler.event_tx.send(Event::Skipped {
        reference: job.reference.clone(),
    });
    JobOutcome {
        reference: job.reference,
        state: job.state,
        error: None,
    }
}

async fn run_locked(crawler: &RepoCrawler, job: &mut CrawlJob) -> Result<()> {
    // ResolveDownloadURL
    job.state = JobState::Resolving;
    let archive_url = resolve_archive_url(crawler, &job.reference).await?;

    // Download: one throttle slot bounds concurrent archive fetches; the
    // token drops (and frees the slot) on every exit path from here on
    job.state = JobState::Downloading;
    let token = tokio::select! {
        token = crawler.throttle.acquire() => token,
        _ = crawler.cancel.cancelled() => return Err(Error::Cancelled),
    };
    let archive_bytes = tokio::select! {
        result = crawler
            .fetcher
            .fetch_archive(&archive_url, crawler.config.fetch.download_retries) => result?,
        _ = crawler.cancel.cancelled() => return Err(Error::Cancelled),
    };

    // Extract into the lock directory; it doubles as the staging area
    job.state = JobState::Extracting;
    let staging = crawler.locks.lock_path(&job.reference);
    let suffix = crawler.config.language.source_suffix();
    let outcome = tokio::task::spawn_blocking(move || {
        SafeZipExtractor::extract(&archive_bytes, suffix, &staging)
    })
    .await
    .map_err(|e| Error::Io(std::io::Error::other(format!("extraction task failed: {e}"))))??;
    drop(token);

    if outcome.skipped_unsafe > 0 {
        warn!(
            reference = %job.reference,
            count = outcome.skipped_unsafe,
            "archive contained unsafe entry names"
        );
    }
    info!(
        reference = %job.reference,
        extracted = outcome.extracted,
        "extracted source files"
    );

    // Publish: the single rename that makes the repository "crawled" for
    // all observers, including other processes sharing the root
    crawler.locks.publish(&job.reference)?;
    Ok(())
}

async fn resolve_archive_url(crawler: &RepoCrawler, reference: &RepoReference) -> Result<Url> {
    let landing_url = crawler.base_url.join(reference.as_str())?;
    let body = tokio::select! {
        result = crawler
            .fetcher
            .fetch_bounded(&landing_url, crawler.config.fetch.resolve_retries) => result?,
        _ = crawler.cancel.cancelled() => return Err(Error::Cancelled),
    };
    let text = String::from_utf8_lossy(&body);
    crawler
        .parser
        .parse_landing(&landing_url, &text)
        .map_err(|e| {
            error!(url = %landing_url, "unparseable landing page");
            e
        })
}

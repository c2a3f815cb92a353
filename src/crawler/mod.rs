//! Crawl engine split into focused submodules.
//!
//! - [`orchestrator`] - pagination loop, per-page barrier, shutdown drain
//! - [`pipeline`] - per-repository state machine

mod orchestrator;
mod pipeline;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::lock::RepoLockStore;
use crate::parser::{HtmlPageParser, PageParser};
use crate::throttle::DownloadThrottle;
use crate::types::Event;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main crawler instance (cloneable - all fields are cheap or Arc-wrapped)
#[derive(Clone)]
pub struct RepoCrawler {
    /// Configuration (wrapped in Arc for sharing across pipeline tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP fetcher shared by the pagination loop and all pipelines
    pub(crate) fetcher: PageFetcher,
    /// Page-parsing capability (trait object for pluggable markup dialects)
    pub(crate) parser: Arc<dyn PageParser>,
    /// Filesystem lock and completion markers
    pub(crate) locks: RepoLockStore,
    /// Bound on concurrent archive downloads
    pub(crate) throttle: DownloadThrottle,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Cooperative cancellation for the crawl loop and pipelines
    pub(crate) cancel: CancellationToken,
    /// Base URL repository references resolve against
    pub(crate) base_url: Url,
    /// First listing page
    pub(crate) start_url: Url,
}

impl RepoCrawler {
    /// Create a crawler using the default HTML page parser.
    ///
    /// Validates the configuration and creates the crawl root directory.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_parser(config, Arc::new(HtmlPageParser))
    }

    /// Create a crawler with a custom [`PageParser`] implementation
    pub fn with_parser(config: Config, parser: Arc<dyn PageParser>) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.root_dir)?;

        let base_url = config.base_url()?;
        let start_url = config.start_url()?;
        let fetcher = PageFetcher::new(config.fetch.clone());
        let locks = RepoLockStore::new(config.root_dir.clone());
        let throttle = DownloadThrottle::new(config.max_concurrent_downloads);
        // buffer sized so a burst of per-repository events doesn't lag a
        // subscriber that only samples occasionally
        let (event_tx, _rx) = broadcast::channel(1024);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            parser,
            locks,
            throttle,
            event_tx,
            cancel: CancellationToken::new(),
            base_url,
            start_url,
        })
    }

    /// Subscribe to crawl events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Drive the crawl from the configured start URL.
    ///
    /// Runs indefinitely across listing pages. Returns `Ok(())` only after
    /// a cooperative shutdown; returns an error on a fatal pagination-level
    /// failure (listing transport error or malformed listing page).
    pub async fn run(&self) -> Result<()> {
        orchestrator::run(self).await
    }

    /// Request cooperative cancellation.
    ///
    /// Outstanding pipelines are interrupted at their next suspension
    /// point and given a bounded grace period to release their locks
    /// before [`run`](Self::run) returns.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        self.cancel.cancel();
    }
}

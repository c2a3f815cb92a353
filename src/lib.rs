//! # repo-crawler
//!
//! Crash-safe crawler for repository default-branch source archives.
//!
//! The crawler walks a paginated listing of remote repositories, downloads
//! each repository's default-branch zip archive, extracts only the source
//! files for the configured language, and records completion on the
//! filesystem so that re-running never re-downloads or corrupts
//! already-fetched data — even across crashes and concurrent runs.
//!
//! ## Design Philosophy
//!
//! - **Crash-safe by construction** - a repository directory exists if and
//!   only if it was fully crawled; everything in flight lives behind a
//!   lock/staging directory published with a single atomic rename
//! - **Per-repository failure isolation** - one broken repository never
//!   stops the crawl; only the listing mechanism breaking does
//! - **Library-first** - the binary is a thin CLI over [`RepoCrawler`]
//! - **Event-driven** - consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_crawler::{Config, Language, RepoCrawler, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         language: Language::Go,
//!         root_dir: "./corpus".into(),
//!         ..Default::default()
//!     };
//!
//!     let crawler = RepoCrawler::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = crawler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Crawl until interrupted
//!     run_with_shutdown(crawler).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Crawl engine (orchestrator + per-repository pipeline)
pub mod crawler;
/// Error types
pub mod error;
/// Filtered, traversal-safe archive extraction
pub mod extract;
/// Page and archive fetching with retry policies
pub mod fetch;
/// Filesystem lock and completion markers
pub mod lock;
/// Listing and landing page parsing
pub mod parser;
/// Bound on concurrent archive downloads
pub mod throttle;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, FetchConfig, Language};
pub use crawler::RepoCrawler;
pub use error::{Error, Result};
pub use extract::{ExtractOutcome, SafeZipExtractor};
pub use fetch::PageFetcher;
pub use lock::RepoLockStore;
pub use parser::{HtmlPageParser, PageParser};
pub use throttle::{DownloadThrottle, ThrottleToken};
pub use types::{Event, JobState, RepoReference, SearchPage};

/// Helper function to run the crawler with graceful signal handling.
///
/// Drives the crawl and, on a termination signal, requests cooperative
/// shutdown; [`RepoCrawler::run`] then gives outstanding pipelines a
/// bounded grace period to release their locks before returning.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use repo_crawler::{Config, RepoCrawler, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let crawler = RepoCrawler::new(Config::default())?;
///     run_with_shutdown(crawler).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(crawler: RepoCrawler) -> Result<()> {
    let runner = crawler.clone();
    let mut crawl = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut crawl => return flatten_join(result),
        _ = wait_for_signal() => {
            crawler.shutdown();
        }
    }
    flatten_join(crawl.await)
}

fn flatten_join(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(Error::Io(std::io::Error::other(format!(
            "crawl task failed: {e}"
        )))),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

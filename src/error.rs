//! Error types for repo-crawler
//!
//! Failures scoped to a single repository (resolve, download, extract) are
//! recovered inside the pipeline; failures scoped to the pagination loop
//! (listing fetch transport errors, listing parse errors) terminate the crawl.

use thiserror::Error;

/// Result type alias for repo-crawler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for repo-crawler
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Non-success HTTP response status
    #[error("{status} response from {url}")]
    Status {
        /// The HTTP status code returned
        status: u16,
        /// The URL that returned it
        url: String,
    },

    /// Transport-level network failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Bounded retry budget spent without a successful response
    #[error("gave up on {url} after {attempts} attempts")]
    ExhaustedRetries {
        /// The URL that kept failing
        url: String,
        /// Total attempts made (initial try plus retries)
        attempts: u32,
    },

    /// Listing page missing its expected structure (fatal for the crawl)
    #[error("malformed listing page {url}: {reason}")]
    MalformedListing {
        /// The listing page URL
        url: String,
        /// What was missing or unexpected
        reason: String,
    },

    /// Repository landing page missing the archive control (abandons that repository)
    #[error("malformed landing page {url}: {reason}")]
    MalformedLandingPage {
        /// The landing page URL
        url: String,
        /// What was missing or unexpected
        reason: String,
    },

    /// URL parsing or resolution failure
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Archive could not be read
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown requested while the operation was in flight
    #[error("crawl cancelled")]
    Cancelled,
}

impl Error {
    /// True for errors that terminate the whole crawl rather than a single
    /// repository: the pagination loop has no isolation boundary.
    #[must_use]
    pub fn is_crawl_fatal(&self) -> bool {
        matches!(self, Error::MalformedListing { .. })
    }
}

//! Core types and events

use std::fmt;
use url::Url;

/// Opaque identifier for one remote repository, as it appears in listing
/// markup (a path segment such as `/rust-lang/rust`).
///
/// The derived directory names are what the crawler actually touches on
/// disk: `dest_name` is the completion marker, `lock_name` the transient
/// lock/staging directory (same name with a `_` prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoReference(String);

impl RepoReference {
    /// Wrap a raw reference string from a listing page
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The reference exactly as it appeared in the listing
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe directory name for the completion marker.
    ///
    /// Surrounding slashes are trimmed, interior slashes become `_`, and
    /// the result is sanitized: a leading `_` or `.` becomes `-` (so a
    /// marker can never be mistaken for a lock directory or a hidden
    /// file), and any non-ASCII character becomes `?`.
    #[must_use]
    pub fn dest_name(&self) -> String {
        sanitize(&self.0.trim_matches('/').replace('/', "_"))
    }

    /// Directory name for the transient lock/staging directory
    #[must_use]
    pub fn lock_name(&self) -> String {
        format!("_{}", self.dest_name())
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, c) in name.chars().enumerate() {
        if i == 0 && (c == '_' || c == '.') {
            out.push('-');
        } else if c.is_ascii() {
            out.push(c);
        } else {
            out.push('?');
        }
    }
    out
}

/// One fetched listing page: an ordered sequence of references plus the
/// next page's URL. Pagination is treated as unbounded; there is no
/// terminal-page representation.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Repository references in listing order
    pub references: Vec<RepoReference>,
    /// Where the next listing page lives
    pub next_page: Url,
}

/// Lifecycle of one per-repository crawl job.
///
/// Owned exclusively by the pipeline instance processing that reference;
/// `Published`, `Skipped` and `Failed` are terminal and none of them
/// triggers a re-attempt within the same crawl cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, nothing attempted yet
    Pending,
    /// Lock directory created; this pipeline owns the reference
    LockHeld,
    /// Fetching the landing page to locate the archive URL
    Resolving,
    /// Archive download in flight (holds a throttle token)
    Downloading,
    /// Writing filtered entries into the staging directory
    Extracting,
    /// Destination renamed into place; the repository is done
    Published,
    /// Lock contention or destination already present
    Skipped,
    /// Abandoned after an error; lock cleaned up
    Failed,
}

impl JobState {
    /// True once the job can make no further progress
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Published | JobState::Skipped | JobState::Failed)
    }
}

/// Events broadcast by the crawler.
///
/// Consumers subscribe via [`crate::RepoCrawler::subscribe`]; no polling
/// required. Lagging subscribers lose old events rather than blocking the
/// crawl.
#[derive(Debug, Clone)]
pub enum Event {
    /// A repository was fully crawled and its destination published
    Published {
        /// The repository that was published
        reference: RepoReference,
    },
    /// A repository was skipped (lock contention or already crawled)
    Skipped {
        /// The repository that was skipped
        reference: RepoReference,
    },
    /// A repository was abandoned after an error
    Failed {
        /// The repository that failed
        reference: RepoReference,
        /// Rendered diagnostic for the failure
        reason: String,
    },
    /// Every pipeline spawned for a listing page reached a terminal state
    /// (or the page timeout elapsed with some still outstanding)
    PageCompleted {
        /// Jobs that ended in `Published`
        published: usize,
        /// Jobs that ended in `Skipped`
        skipped: usize,
        /// Jobs that ended in `Failed`
        failed: usize,
    },
    /// The crawler is exiting after a shutdown request
    Shutdown,
}

//! Filesystem-backed mutual exclusion and completion markers
//!
//! One marker pair per repository under the crawl root:
//! `<root>/<name>` is the completion marker (its presence is the only
//! externally observable "done" signal), `<root>/_<name>` is the transient
//! lock directory, which doubles as the extraction staging area.
//!
//! A lock directory left behind by a crashed run is never reclaimed
//! automatically; it blocks that repository until an operator removes it.
//! Sweeping stale `_` directories is a manual operation by design — there
//! is no cross-process coordination to decide staleness safely.

use crate::error::Result;
use crate::types::RepoReference;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lock and completion markers for every repository under one root.
///
/// The four operations here are the entire mutual-exclusion contract
/// between pipelines (and between processes sharing the root); no other
/// synchronization exists for the same reference.
#[derive(Clone, Debug)]
pub struct RepoLockStore {
    root: PathBuf,
}

impl RepoLockStore {
    /// Create a store rooted at `root` (the directory must exist)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The completion-marker directory for a reference
    #[must_use]
    pub fn dest_path(&self, reference: &RepoReference) -> PathBuf {
        self.root.join(reference.dest_name())
    }

    /// The lock/staging directory for a reference
    #[must_use]
    pub fn lock_path(&self, reference: &RepoReference) -> PathBuf {
        self.root.join(reference.lock_name())
    }

    /// Atomically create the lock directory if absent.
    ///
    /// Returns `false` when the lock already exists — another pipeline or
    /// process owns the reference. This is not an error condition.
    pub fn try_acquire(&self, reference: &RepoReference) -> Result<bool> {
        match std::fs::create_dir(self.lock_path(reference)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the completion marker exists
    #[must_use]
    pub fn exists(&self, reference: &RepoReference) -> bool {
        self.dest_path(reference).exists()
    }

    /// Atomically rename the lock/staging directory into the completion
    /// marker. This single rename is the visibility point at which the
    /// repository becomes "crawled" to every observer.
    pub fn publish(&self, reference: &RepoReference) -> Result<()> {
        let lock = self.lock_path(reference);
        let dest = self.dest_path(reference);
        debug!(from = %lock.display(), to = %dest.display(), "publishing");
        std::fs::rename(lock, dest)?;
        Ok(())
    }

    /// Recursively delete the lock directory, releasing the reference.
    ///
    /// Missing-directory errors are swallowed so cleanup paths can call
    /// this unconditionally.
    pub fn abandon(&self, reference: &RepoReference) -> Result<()> {
        match std::fs::remove_dir_all(self.lock_path(reference)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The configured crawl root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

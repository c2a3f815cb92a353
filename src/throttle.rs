//! In-process bound on concurrently active archive downloads

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore of fixed capacity shared by all pipelines.
///
/// Bounds concurrent outbound archive downloads independent of how many
/// repositories are in flight per page. Purely in-process: reinitialized
/// fresh on every start, it provides no cross-process coordination — the
/// filesystem lock store is the only authority visible across processes.
#[derive(Clone)]
pub struct DownloadThrottle {
    slots: Arc<Semaphore>,
}

/// Ownership of one download slot. Dropping the token returns the slot,
/// so it is released on every exit path, success or failure.
pub struct ThrottleToken {
    _permit: OwnedSemaphorePermit,
}

impl DownloadThrottle {
    /// Create a throttle with `capacity` download slots
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Wait until a download slot is free and take it
    pub async fn acquire(&self) -> ThrottleToken {
        match self.slots.clone().acquire_owned().await {
            Ok(permit) => ThrottleToken { _permit: permit },
            // the semaphore is owned by this struct and never closed
            Err(_) => unreachable!("download throttle semaphore closed"),
        }
    }

    /// Slots currently free (diagnostics and tests)
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

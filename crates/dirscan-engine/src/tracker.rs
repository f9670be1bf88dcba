//! Counting join over dynamically spawned work.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Tracks pending traversal and scan tasks.
///
/// Every task holds a [`PendingGuard`] for its lifetime; dropping the guard
/// marks the unit done on every exit path. New units are registered by a
/// task that still holds its own guard, so the count cannot touch zero while
/// reachable work remains, and reaches zero exactly once.
#[derive(Debug, Clone, Default)]
pub struct PendingTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    pending: AtomicUsize,
    idle: Notify,
}

/// One registered, not yet completed unit of work.
#[derive(Debug)]
#[must_use = "the unit is marked done as soon as the guard is dropped"]
pub struct PendingGuard {
    inner: Arc<TrackerInner>,
}

impl PendingTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new unit of work before spawning it.
    pub fn register(&self) -> PendingGuard {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of units registered and not yet done.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Wait until every registered unit is done.
    ///
    /// Returns immediately if nothing is pending.
    pub async fn wait(&self) {
        loop {
            let idle = self.inner.idle.notified();
            tokio::pin!(idle);
            // Enable before the check so a wakeup between the two is not lost.
            idle.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl PendingGuard {
    /// Mark this unit done.
    pub fn done(self) {}
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

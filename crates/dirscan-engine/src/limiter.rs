//! Bounded admission for scan calls.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use dirscan_core::Concurrency;

/// Counting gate on concurrent scan calls.
///
/// Only scan execution goes through the gate; directory enumeration never
/// takes a slot, so traversal always makes progress even at capacity 1.
/// The unlimited configuration has no semaphore at all.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    slots: Option<Arc<Semaphore>>,
    capacity: Option<usize>,
}

/// A held admission slot. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct AdmissionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionPermit {
    /// Release the slot.
    pub fn release(self) {}
}

impl AdmissionLimiter {
    /// Create a limiter for the given concurrency.
    pub fn new(concurrency: Concurrency) -> Self {
        match concurrency {
            Concurrency::Limited(n) => {
                let n = n.get().min(Semaphore::MAX_PERMITS);
                Self {
                    slots: Some(Arc::new(Semaphore::new(n))),
                    capacity: Some(n),
                }
            }
            Concurrency::Unlimited => Self::unlimited(),
        }
    }

    /// A limiter that never blocks.
    pub fn unlimited() -> Self {
        Self {
            slots: None,
            capacity: None,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> AdmissionPermit {
        let permit = match &self.slots {
            // Never closed, so this only yields None for the unlimited gate.
            Some(slots) => Arc::clone(slots).acquire_owned().await.ok(),
            None => None,
        };
        AdmissionPermit { _permit: permit }
    }

    /// Configured capacity (None = unlimited).
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Slots currently free (None = unlimited).
    pub fn available(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }
}

//! Admission control for concurrent transfers.
//!
//! An [`AdmissionPool`] hands out a fixed number of [`AdmissionTicket`]s.
//! A worker holds its ticket from the moment it is admitted until its
//! process has terminated; dropping the ticket returns the slot, so every
//! exit path (clean exit, spawn failure, cancellation, panic) releases it
//! exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of concurrent transfers.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Bounded pool of transfer slots.
#[derive(Debug, Clone)]
pub struct AdmissionPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl AdmissionPool {
    /// Create a pool of `capacity` slots (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    ///
    /// Returns `None` only if the pool has been closed.
    pub async fn acquire(&self) -> Option<AdmissionTicket> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        Some(self.issue(permit))
    }

    /// Take a free slot without waiting.
    pub fn try_acquire(&self) -> Option<AdmissionTicket> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(self.issue(permit))
    }

    fn issue(&self, permit: OwnedSemaphorePermit) -> AdmissionTicket {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        AdmissionTicket {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Tickets currently held.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of tickets ever held at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for AdmissionPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

/// One slot of an [`AdmissionPool`]. Released on drop.
#[derive(Debug)]
pub struct AdmissionTicket {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_capacity_minimum_is_one() {
        assert_eq!(AdmissionPool::new(0).capacity(), 1);
        assert_eq!(AdmissionPool::default().capacity(), 2);
    }

    #[test]
    fn test_tickets_are_bounded() {
        let pool = AdmissionPool::new(2);
        let a = pool.try_acquire().unwrap();
        let _b = pool.try_acquire().unwrap();

        assert!(pool.try_acquire().is_none());
        assert_eq!(pool.in_flight(), 2);

        drop(a);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.in_flight(), 1);
        assert!(pool.try_acquire().is_some());
        assert_eq!(pool.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_waiter_admitted_after_release() {
        let pool = AdmissionPool::new(1);
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let admitted = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(admitted);
    }
}

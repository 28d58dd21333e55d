//! Per-key mutual exclusion.
//!
//! Each key maps to a `Semaphore(1)`.  Holding the permit gives exclusive
//! access for that key; other callers for the same key wait in FIFO
//! order.  Different keys never block each other.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Default)]
pub struct KeyedLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl KeyedLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.  The permit releases on drop.
    pub async fn acquire(&self, key: &str) -> Result<OwnedSemaphorePermit, LockClosed> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| LockClosed)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries nobody holds or waits on.
    ///
    /// A semaphore referenced only by the map has no holder (permits keep
    /// an `Arc`) and no waiter (waiters clone it under the map lock).
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}

/// The semaphore behind a key was closed.
#[derive(Debug)]
pub struct LockClosed;

impl std::fmt::Display for LockClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "keyed lock closed")
    }
}

impl std::error::Error for LockClosed {}

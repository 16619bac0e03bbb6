//! Per-key read/write leases.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A table of read/write locks addressed by string key.
///
/// An entry exists only while some [`KeyLease`] for its key is alive.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

/// Handle on the lock for one key. Take [`read`](KeyLease::read) or
/// [`write`](KeyLease::write) guards from it; dropping the last handle for a
/// key removes the key from the table.
#[derive(Debug)]
pub struct KeyLease<'a> {
    owner: &'a KeyedLocks,
    key: String,
    lock: Arc<RwLock<()>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<RwLock<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a handle on the lock for `key`, creating it if needed.
    pub fn lease(&self, key: &str) -> KeyLease<'_> {
        let lock = Arc::clone(self.table().entry(key.to_string()).or_default());

        KeyLease {
            owner: self,
            key: key.to_string(),
            lock,
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyLease<'_> {
    /// Acquire a shared guard, ignoring poisoning.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire an exclusive guard, ignoring poisoning.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire a shared guard if no writer holds the lock.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, ()>> {
        self.lock.try_read().ok()
    }

    /// Acquire an exclusive guard if nobody holds the lock.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        self.lock.try_write().ok()
    }
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        // Handles are cloned under the table mutex, so the count is stable here.
        let mut table = self.owner.table();
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.key);
        }
    }
}

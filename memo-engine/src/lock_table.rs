//! Per-memory exclusive locks, LRU-evicted at a bounded capacity (spec
//! §5): writes to the same `(user_id, memory_id)` pair serialize through
//! the lock returned here; idle entries are evicted once the table fills.

use std::{num::NonZeroUsize, sync::Arc};

use async_lock::Mutex as AsyncMutex;
use lru::LruCache;
use parking_lot::Mutex as SyncMutex;

/// A bounded map from lock key to an async mutex guarding that key's
/// critical section.
///
/// Lookup/insert into the LRU itself is synchronous and brief (a
/// `parking_lot::Mutex`); actually waiting for exclusivity happens on the
/// returned `async_lock::Mutex`, which can be held across `.await` points.
pub struct LockTable {
    cache: SyncMutex<LruCache<String, Arc<AsyncMutex<()>>>>,
}

impl std::fmt::Debug for LockTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockTable")
            .field("len", &self.cache.lock().len())
            .finish()
    }
}

impl LockTable {
    /// Creates a lock table holding at most `capacity` distinct keys.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: SyncMutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the (possibly freshly created) lock for `key`, marking it
    /// most-recently-used.
    #[must_use]
    pub fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut cache = self.cache.lock();
        if let Some(lock) = cache.get(key) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(AsyncMutex::new(()));
        cache.put(key.to_string(), Arc::clone(&lock));
        lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_returns_the_same_lock() {
        let table = LockTable::new(16);
        let a = table.lock_for("mem-1");
        let b = table.lock_for("mem-1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_keys_get_independent_locks() {
        let table = LockTable::new(16);
        let a = table.lock_for("mem-1");
        let b = table.lock_for("mem-2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn evicts_least_recently_used_beyond_capacity() {
        let table = LockTable::new(1);
        let first = table.lock_for("mem-1");
        let _second = table.lock_for("mem-2");
        let first_again = table.lock_for("mem-1");
        assert!(!Arc::ptr_eq(&first, &first_again));
    }
}

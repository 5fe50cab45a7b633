//! LRU snapshot cache
//!
//! Keyed by `(number, hash)` so snapshots on competing branches at the same
//! height never collide.

use crate::domain::Snapshot;
use crate::metrics;
use crate::ports::SnapshotStore;
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of cached snapshots.
pub const DEFAULT_SNAPSHOT_CACHE_SIZE: usize = 128;

pub struct LruSnapshotCache {
    inner: Mutex<LruCache<(u64, Hash), Arc<Snapshot>>>,
}

impl LruSnapshotCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for LruSnapshotCache {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CACHE_SIZE)
    }
}

impl SnapshotStore for LruSnapshotCache {
    fn get(&self, number: u64, hash: &Hash) -> Option<Arc<Snapshot>> {
        let found = self.inner.lock().get(&(number, *hash)).cloned();
        match found {
            Some(_) => metrics::record_snapshot_cache_hit(),
            None => metrics::record_snapshot_cache_miss(),
        }
        found
    }

    fn insert(&self, snapshot: Arc<Snapshot>) {
        let key = (snapshot.number(), snapshot.hash());
        self.inner.lock().put(key, snapshot);
    }
}

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::model::ItemId;

/// Read-through value cache in front of the engine.
///
/// Capacity 0 disables caching entirely; lookups then always miss and fall
/// through to the data file.
pub(crate) struct ValueCache<V> {
    inner: Option<LruCache<ItemId, V>>,
}

impl<V> ValueCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn get(&mut self, id: ItemId) -> Option<&V> {
        self.inner.as_mut()?.get(&id)
    }

    pub fn put(&mut self, id: ItemId, value: V) {
        if let Some(cache) = self.inner.as_mut() {
            cache.put(id, value);
        }
    }

    pub fn remove(&mut self, id: ItemId) {
        if let Some(cache) = self.inner.as_mut() {
            cache.pop(&id);
        }
    }
}

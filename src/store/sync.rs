use parking_lot::Mutex;

use crate::codec::ObjectCodec;
use crate::config::StoreOptions;
use crate::error::Result;
use crate::model::ItemId;
use crate::store::Store;

/// Thread-safe decorator around a [`Store`].
///
/// One coarse mutex covers every public operation end-to-end; callers share
/// the wrapper behind an `Arc`. For compound operations (read-modify-write,
/// queries) use [`with`](SyncStore::with) to hold the lock across the whole
/// sequence.
pub struct SyncStore<C: ObjectCodec> {
    inner: Mutex<Store<C>>,
}

impl<C: ObjectCodec> SyncStore<C>
where
    C::Value: Clone,
{
    pub fn open(options: StoreOptions, codec: C) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Store::open(options, codec)?),
        })
    }

    /// Wraps an already-open store.
    pub fn from_store(store: Store<C>) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    pub fn store(&self, value: &C::Value) -> Result<ItemId> {
        self.inner.lock().store(value)
    }

    pub fn get(&self, id: ItemId) -> Result<C::Value> {
        self.inner.lock().get(id)
    }

    pub fn update(&self, id: ItemId, value: &C::Value) -> Result<()> {
        self.inner.lock().update(id, value)
    }

    pub fn delete(&self, id: ItemId) -> Result<()> {
        self.inner.lock().delete(id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.inner.lock().contains(id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.inner.lock().ids()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn compact(&self) -> Result<()> {
        self.inner.lock().compact()
    }

    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }

    /// Runs `f` with exclusive access to the underlying store, holding the
    /// lock for the full call.
    pub fn with<R>(&self, f: impl FnOnce(&mut Store<C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

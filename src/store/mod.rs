//! The public store surface.
//!
//! A [`Store`] pairs the data-file engine with an [`ObjectCodec`] and a
//! read-through value cache. Values are encoded into a reused buffer and
//! handed to the engine as opaque bytes; the engine decides every file
//! offset and owns durability.

mod cache;
mod query;
mod sync;

use tracing::debug;

use crate::codec::ObjectCodec;
use crate::config::StoreOptions;
use crate::datafile::DataFile;
use crate::error::Result;
use crate::model::ItemId;

use cache::ValueCache;
pub use query::Query;
pub use sync::SyncStore;

/// An embedded object store persisting values of one codec-defined type.
pub struct Store<C: ObjectCodec> {
    datafile: DataFile,
    codec: C,
    cache: ValueCache<C::Value>,
    encode_buf: Vec<u8>,
}

impl<C: ObjectCodec> Store<C>
where
    C::Value: Clone,
{
    /// Opens the store described by `options`, creating the data file if it
    /// does not exist yet.
    pub fn open(options: StoreOptions, codec: C) -> Result<Self> {
        let datafile = DataFile::open(&options)?;
        debug!(
            path = %options.path.display(),
            items = datafile.len(),
            "store.open"
        );
        Ok(Self {
            datafile,
            codec,
            cache: ValueCache::new(options.cache_capacity),
            encode_buf: Vec::new(),
        })
    }

    /// Persists `value` under a freshly minted id and returns it.
    pub fn store(&mut self, value: &C::Value) -> Result<ItemId> {
        self.encode_buf.clear();
        self.codec.encode(value, &mut self.encode_buf)?;
        let id = self.datafile.insert(&self.encode_buf)?;
        self.cache.put(id, value.clone());
        Ok(id)
    }

    /// Returns the value stored under `id`, reading through the cache.
    pub fn get(&mut self, id: ItemId) -> Result<C::Value> {
        self.datafile.ensure_open()?;
        if let Some(value) = self.cache.get(id) {
            return Ok(value.clone());
        }
        let bytes = self.datafile.read(id)?;
        let value = self.codec.decode(&bytes)?;
        self.cache.put(id, value.clone());
        Ok(value)
    }

    /// Replaces the value stored under `id`; the id stays stable.
    pub fn update(&mut self, id: ItemId, value: &C::Value) -> Result<()> {
        self.encode_buf.clear();
        self.codec.encode(value, &mut self.encode_buf)?;
        self.datafile.update(id, &self.encode_buf)?;
        self.cache.put(id, value.clone());
        Ok(())
    }

    /// Deletes the item stored under `id`.
    pub fn delete(&mut self, id: ItemId) -> Result<()> {
        self.datafile.remove(id)?;
        self.cache.remove(id);
        Ok(())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.datafile.contains(id)
    }

    /// Sorted snapshot of every live id; unaffected by later mutations.
    pub fn ids(&self) -> Vec<ItemId> {
        self.datafile.ids()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.datafile.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datafile.is_empty()
    }

    /// Starts a filtered scan over the current items.
    pub fn query(&mut self) -> Query<'_, C> {
        Query::new(self)
    }

    /// Reclaims free space at the end of the data file.
    pub fn compact(&mut self) -> Result<()> {
        self.datafile.compact()
    }

    /// Current length of the data file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        self.datafile.file_len()
    }

    /// Flushes and releases the data file; later operations fail
    /// [`Closed`](crate::StoreError::Closed).
    pub fn close(&mut self) -> Result<()> {
        self.datafile.close()
    }
}

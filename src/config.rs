use std::path::{Path, PathBuf};

use crate::datafile::{MAX_ID, MIN_ID};
use crate::error::{Result, StoreError};

/// Configuration supplied when opening a [`Store`](crate::Store).
///
/// All settings except the data file path have defaults. A store's on-disk
/// geometry depends on these values only at creation time; reopening an
/// existing file with a different `min_file_size` or `start_id` is harmless
/// (the file's own NEXT_ID cell wins).
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Path of the single data file owned by the store.
    pub path: PathBuf,
    /// Size in bytes of the scratch buffer used for all file I/O.
    pub scratch_buffer_size: usize,
    /// Minimum length a freshly created data file is grown to.
    pub min_file_size: u64,
    /// Minimum chunk added to the file when no free interval can satisfy an
    /// allocation.
    pub growth_quantum: u64,
    /// First id handed out in a fresh file.
    pub start_id: u64,
    /// Capacity of the read-through value cache; 0 disables caching.
    pub cache_capacity: usize,
}

impl StoreOptions {
    /// Creates options for the data file at `path` with default settings.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            scratch_buffer_size: 8192,
            min_file_size: 1024,
            growth_quantum: 512,
            start_id: MIN_ID,
            cache_capacity: 1024,
        }
    }

    /// Sets the scratch buffer size used for file I/O.
    pub fn scratch_buffer_size(mut self, bytes: usize) -> Self {
        self.scratch_buffer_size = bytes;
        self
    }

    /// Sets the minimum length of a freshly created data file.
    pub fn min_file_size(mut self, bytes: u64) -> Self {
        self.min_file_size = bytes;
        self
    }

    /// Sets the minimum amount the data file grows by on allocation misses.
    pub fn growth_quantum(mut self, bytes: u64) -> Self {
        self.growth_quantum = bytes;
        self
    }

    /// Sets the first id handed out in a fresh file.
    pub fn start_id(mut self, id: u64) -> Self {
        self.start_id = id;
        self
    }

    /// Sets the value cache capacity; 0 disables the cache.
    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.cache_capacity = entries;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.scratch_buffer_size == 0 {
            return Err(StoreError::Precondition(
                "scratch_buffer_size must be positive".into(),
            ));
        }
        if self.min_file_size == 0 {
            return Err(StoreError::Precondition(
                "min_file_size must be positive".into(),
            ));
        }
        if !(MIN_ID..=MAX_ID).contains(&self.start_id) {
            return Err(StoreError::Precondition(format!(
                "start_id {} outside [{MIN_ID}, {MAX_ID}]",
                self.start_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = StoreOptions::new("store.dat");
        assert!(opts.validate().is_ok());
        assert_eq!(opts.scratch_buffer_size, 8192);
        assert_eq!(opts.min_file_size, 1024);
        assert_eq!(opts.growth_quantum, 512);
        assert_eq!(opts.start_id, 500);
    }

    #[test]
    fn builder_overrides_defaults() {
        let opts = StoreOptions::new("store.dat")
            .scratch_buffer_size(64)
            .min_file_size(4096)
            .growth_quantum(0)
            .start_id(1_000)
            .cache_capacity(0);
        assert!(opts.validate().is_ok());
        assert_eq!(opts.scratch_buffer_size, 64);
        assert_eq!(opts.min_file_size, 4096);
        assert_eq!(opts.growth_quantum, 0);
        assert_eq!(opts.start_id, 1_000);
        assert_eq!(opts.cache_capacity, 0);
    }

    #[test]
    fn zero_scratch_buffer_is_rejected() {
        let opts = StoreOptions::new("store.dat").scratch_buffer_size(0);
        assert!(matches!(
            opts.validate(),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn zero_min_file_size_is_rejected() {
        let opts = StoreOptions::new("store.dat").min_file_size(0);
        assert!(matches!(
            opts.validate(),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn start_id_below_minimum_is_rejected() {
        let opts = StoreOptions::new("store.dat").start_id(499);
        assert!(matches!(
            opts.validate(),
            Err(StoreError::Precondition(_))
        ));
    }

    #[test]
    fn start_id_above_maximum_is_rejected() {
        let opts = StoreOptions::new("store.dat").start_id(MAX_ID + 1);
        assert!(matches!(
            opts.validate(),
            Err(StoreError::Precondition(_))
        ));
    }
}

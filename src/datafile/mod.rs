//! # Data-file engine
//!
//! One engine instance owns one data file and every byte offset in it. The
//! file holds three kinds of regions: the next-id cell, a linked chain of
//! fixed-width index blocks, and variable-length payload regions separated
//! by free gaps.
//!
//! ## File layout
//!
//! ```text
//! Offset  Size      Description
//! ------  --------  ----------------------------------------
//! 0       8         NEXT_ID: next id to hand out
//! 8       2408      first index block (always present)
//! ...               payload regions, further index blocks, free gaps
//! ```
//!
//! An index block is an 8-byte pointer to the next block (0 terminates the
//! chain) followed by 100 slots of 24 bytes each; a slot holds
//! `(id, data_begin, data_end)` and is free when `id == 0`. All integers are
//! little-endian u64, fixed for the life of the file.
//!
//! ## Durability
//!
//! Every mutating operation stages its bytes and ends in exactly one fsync;
//! the in-memory maps are only updated after that fsync returns. A crash
//! therefore leaves the file either in the state preceding the call or with
//! the call fully applied, and [`DataFile::open`] rebuilds all in-memory
//! state from the file alone.

mod fileio;
mod freespace;
mod slots;

/// Payload location and slot metadata types.
pub mod index;

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::config::StoreOptions;
use crate::error::{Result, StoreError};
use crate::model::{ItemId, EMPTY_SLOT_ID};

use fileio::FileIo;
use freespace::FreeSpaceMap;
pub use index::{Index, Interval};
use slots::SlotPool;

/// Smallest id ever handed out; keeps 0 free to mark empty slots.
pub const MIN_ID: u64 = 500;
/// Largest id the store will mint.
pub const MAX_ID: u64 = i64::MAX as u64;

const NEXT_ID_SIZE: u64 = 8;
const INDICES_PER_BLOCK: u64 = 100;
const INDEX_SLOT_SIZE: u64 = 24;
/// Size in bytes of one index block: next-pointer plus 100 slots.
pub const INDEX_BLOCK_SIZE: u64 = 8 + INDICES_PER_BLOCK * INDEX_SLOT_SIZE;
/// Smallest possible data file: the next-id cell and the first index block.
pub const MIN_FILE_SIZE: u64 = NEXT_ID_SIZE + INDEX_BLOCK_SIZE;

const FIRST_BLOCK_OFFSET: u64 = NEXT_ID_SIZE;

/// The single-file storage engine.
///
/// Owns the file handle, the free-space map, the slot pool, the id index,
/// and the cached next-id counter. Not internally synchronized; wrap in
/// [`SyncStore`](crate::SyncStore) for shared access.
#[derive(Debug)]
pub struct DataFile {
    io: Option<FileIo>,
    free: FreeSpaceMap,
    slots: SlotPool,
    indices: HashMap<ItemId, Index>,
    next_id: u64,
    last_block_begin: u64,
    growth_quantum: u64,
}

impl DataFile {
    /// Opens the data file named by `options`, creating and formatting it if
    /// absent, then rebuilds all in-memory state from the file contents.
    pub fn open(options: &StoreOptions) -> Result<Self> {
        options.validate()?;
        let (mut io, created) = FileIo::open(&options.path, options.scratch_buffer_size)?;
        if created {
            let len = MIN_FILE_SIZE.max(options.min_file_size);
            io.grow_to(len)?;
            io.seek(0);
            io.put_u64(options.start_id);
            io.put_zeros(INDEX_BLOCK_SIZE as usize);
            io.commit()?;
            debug!(path = %options.path.display(), len, "datafile.create");
        }
        let mut engine = Self {
            io: Some(io),
            free: FreeSpaceMap::new(),
            slots: SlotPool::new(),
            indices: HashMap::new(),
            next_id: 0,
            last_block_begin: FIRST_BLOCK_OFFSET,
            growth_quantum: options.growth_quantum,
        };
        engine.initialize()?;
        debug!(
            path = %options.path.display(),
            items = engine.indices.len(),
            next_id = engine.next_id,
            "datafile.open"
        );
        Ok(engine)
    }

    /// Scans the file and rebuilds the free-space map, the slot pool, and
    /// the id index. Any structural inconsistency is fatal `Corruption`.
    fn initialize(&mut self) -> Result<()> {
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        let file_len = io.len()?;
        if file_len < MIN_FILE_SIZE {
            return Err(StoreError::Corruption(format!(
                "file length {file_len} below minimum {MIN_FILE_SIZE}"
            )));
        }

        io.seek(0);
        io.fill(NEXT_ID_SIZE as usize)?;
        let next_id = io.take_u64()?;
        if next_id < MIN_ID {
            return Err(StoreError::Corruption(format!(
                "next-id cell {next_id} below minimum id {MIN_ID}"
            )));
        }
        self.free.add(Interval::new(NEXT_ID_SIZE, file_len));

        let mut block_begin = FIRST_BLOCK_OFFSET;
        let mut visited = HashSet::new();
        loop {
            if block_begin + INDEX_BLOCK_SIZE > file_len {
                return Err(StoreError::Corruption(format!(
                    "index block at {block_begin} extends past end of file {file_len}"
                )));
            }
            if !visited.insert(block_begin) {
                return Err(StoreError::Corruption(format!(
                    "index block chain revisits offset {block_begin}"
                )));
            }
            self.last_block_begin = block_begin;
            let block = Interval::new(block_begin, block_begin + INDEX_BLOCK_SIZE);
            self.free.reserve(block).map_err(|_| {
                StoreError::Corruption(format!(
                    "index block at {block_begin} overlaps reserved space"
                ))
            })?;

            io.seek(block_begin);
            io.fill(INDEX_BLOCK_SIZE as usize)?;
            let next_block = io.take_u64()?;
            for slot in 0..INDICES_PER_BLOCK {
                let slot_offset = block_begin + NEXT_ID_SIZE + slot * INDEX_SLOT_SIZE;
                let id = io.take_u64()?;
                let begin = io.take_u64()?;
                let end = io.take_u64()?;
                if id == EMPTY_SLOT_ID {
                    self.slots.push(slot_offset);
                    continue;
                }
                if begin > end || end > file_len {
                    return Err(StoreError::Corruption(format!(
                        "slot at {slot_offset} holds invalid payload interval [{begin}, {end})"
                    )));
                }
                if id >= next_id {
                    return Err(StoreError::Corruption(format!(
                        "live id {id} not below next-id cell {next_id}"
                    )));
                }
                let interval = Interval::new(begin, end);
                self.free.reserve(interval).map_err(|_| {
                    StoreError::Corruption(format!(
                        "payload of id {id} overlaps another reserved interval"
                    ))
                })?;
                trace!(id, begin, end, slot_offset, "datafile.load");
                if self.indices.insert(id, Index::new(id, interval, slot_offset)).is_some() {
                    return Err(StoreError::Corruption(format!("duplicate live id {id}")));
                }
            }
            if next_block == 0 {
                break;
            }
            block_begin = next_block;
        }

        self.next_id = next_id;
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.io.is_none() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Stores `payload` under a freshly minted id.
    pub fn insert(&mut self, payload: &[u8]) -> Result<ItemId> {
        self.ensure_open()?;
        let index = self.reserve(payload.len() as u64)?;
        self.write_payload(&index, payload)?;
        debug!(id = index.id, len = payload.len(), "datafile.insert");
        Ok(index.id)
    }

    /// Returns the payload bytes of `id`.
    pub fn read(&mut self, id: ItemId) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let index = *self.indices.get(&id).ok_or(StoreError::NotFound(id))?;
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        let n = index.payload_len() as usize;
        io.seek(index.interval.begin);
        io.fill(n)?;
        let payload = io.take_bytes(n)?;
        trace!(id, len = n, "datafile.read");
        Ok(payload)
    }

    /// Replaces the payload of `id`. The id is stable but the payload may
    /// move: the old interval is freed and a fresh one reserved.
    pub fn update(&mut self, id: ItemId, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let old = *self.indices.get(&id).ok_or(StoreError::NotFound(id))?;
        self.free_index(&old)?;
        let index = self.reserve_for(id, payload.len() as u64)?;
        self.write_payload(&index, payload)?;
        debug!(id, len = payload.len(), "datafile.update");
        Ok(())
    }

    /// Deletes `id`, returning its payload interval to the free map and its
    /// slot to the pool.
    pub fn remove(&mut self, id: ItemId) -> Result<()> {
        self.ensure_open()?;
        let index = *self.indices.get(&id).ok_or(StoreError::NotFound(id))?;
        self.free_index(&index)?;
        debug!(id, "datafile.remove");
        Ok(())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.indices.contains_key(&id)
    }

    /// Sorted snapshot of every live id.
    pub fn ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.indices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Current length of the data file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        self.io.as_ref().ok_or(StoreError::Closed)?.len()
    }

    /// Coalesces free space and truncates the free tail of the file,
    /// dropping trailing all-free index blocks from the chain where the
    /// geometry allows.
    pub fn compact(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.free.merge_all();
        let old_end = self.io.as_ref().ok_or(StoreError::Closed)?.len()?;
        let mut file_end = old_end;
        loop {
            file_end = self.free.trim_tail(file_end);
            match self.drop_tail_block(file_end)? {
                Some(new_end) => file_end = new_end,
                None => break,
            }
        }
        if file_end != old_end {
            let io = self.io.as_mut().ok_or(StoreError::Closed)?;
            io.truncate(file_end)?;
            io.sync()?;
            debug!(
                old_end,
                new_end = file_end,
                free_intervals = self.free.len(),
                "datafile.compact"
            );
        }
        Ok(())
    }

    /// Fsyncs and releases the file handle; every later call fails `Closed`.
    pub fn close(&mut self) -> Result<()> {
        match self.io.take() {
            Some(io) => {
                io.sync()?;
                debug!("datafile.close");
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }

    /// Finds or creates a free interval of exactly `size` bytes, growing the
    /// file when the map cannot satisfy the request. Zero-sized requests get
    /// the empty interval without touching the map.
    fn acquire_free(&mut self, size: u64) -> Result<Interval> {
        if size == 0 {
            return Ok(Interval::empty());
        }
        loop {
            if let Some(found) = self.free.take(size) {
                let iv = if found.len() > size {
                    self.free
                        .add(Interval::new(found.begin + size, found.end));
                    Interval::new(found.begin, found.begin + size)
                } else {
                    found
                };
                trace!(begin = iv.begin, end = iv.end, "datafile.acquire_free");
                return Ok(iv);
            }
            let io = self.io.as_mut().ok_or(StoreError::Closed)?;
            let old_len = io.len()?;
            let new_len = old_len + size.max(self.growth_quantum);
            io.grow_to(new_len)?;
            self.free.add(Interval::new(old_len, new_len));
            debug!(old_len, new_len, "datafile.grow");
        }
    }

    /// Pops a free slot offset, growing the index-block chain on demand.
    fn acquire_slot(&mut self) -> Result<u64> {
        loop {
            if let Some(offset) = self.slots.pop() {
                return Ok(offset);
            }
            self.create_index_block()?;
        }
    }

    /// Appends a fresh index block to the chain: links it from the current
    /// tail, zeroes it, and feeds its 100 slots to the pool.
    fn create_index_block(&mut self) -> Result<()> {
        let block = self.acquire_free(INDEX_BLOCK_SIZE)?;
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(self.last_block_begin);
        io.put_u64(block.begin);
        io.commit()?;
        io.seek(block.begin);
        io.put_zeros(INDEX_BLOCK_SIZE as usize);
        io.commit()?;
        self.last_block_begin = block.begin;
        for slot in 0..INDICES_PER_BLOCK {
            self.slots
                .push(block.begin + NEXT_ID_SIZE + slot * INDEX_SLOT_SIZE);
        }
        debug!(
            begin = block.begin,
            free_slots = self.slots.len(),
            "datafile.index_block"
        );
        Ok(())
    }

    /// Mints the next id, persisting the incremented counter before the
    /// cached value is advanced.
    fn mint_id(&mut self) -> Result<ItemId> {
        let id = self.next_id;
        if id > MAX_ID {
            return Err(StoreError::IdExhausted);
        }
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(0);
        io.put_u64(id + 1);
        io.commit()?;
        self.next_id = id + 1;
        Ok(id)
    }

    /// Allocates a payload interval and a slot under a fresh id and persists
    /// the slot.
    fn reserve(&mut self, data_len: u64) -> Result<Index> {
        let interval = self.acquire_free(data_len)?;
        let slot_offset = self.acquire_slot()?;
        let id = self.mint_id()?;
        self.write_slot(id, interval, slot_offset)?;
        let index = Index::new(id, interval, slot_offset);
        self.indices.insert(id, index);
        trace!(id, len = data_len, "datafile.reserve");
        Ok(index)
    }

    /// Like [`reserve`](Self::reserve) but reuses an existing id (update
    /// path); the next-id counter is untouched.
    fn reserve_for(&mut self, id: ItemId, data_len: u64) -> Result<Index> {
        let interval = self.acquire_free(data_len)?;
        let slot_offset = self.acquire_slot()?;
        self.write_slot(id, interval, slot_offset)?;
        let index = Index::new(id, interval, slot_offset);
        self.indices.insert(id, index);
        trace!(id, len = data_len, "datafile.reserve_for");
        Ok(index)
    }

    fn write_slot(&mut self, id: ItemId, interval: Interval, slot_offset: u64) -> Result<()> {
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(slot_offset);
        io.put_u64(id);
        io.put_u64(interval.begin);
        io.put_u64(interval.end);
        io.commit()
    }

    fn write_payload(&mut self, index: &Index, payload: &[u8]) -> Result<()> {
        if payload.len() as u64 != index.payload_len() {
            return Err(StoreError::Precondition(format!(
                "payload length {} does not match reserved length {}",
                payload.len(),
                index.payload_len()
            )));
        }
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(index.interval.begin);
        io.put_bytes(payload);
        io.commit()
    }

    /// Zeroes the slot's id on disk, then returns the payload interval to
    /// the free map and the slot to the pool. The slot's stale begin/end
    /// bytes are left in place and ignored on load.
    fn free_index(&mut self, index: &Index) -> Result<()> {
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(index.slot_offset);
        io.put_u64(EMPTY_SLOT_ID);
        io.commit()?;
        self.free.add(index.interval);
        self.slots.push(index.slot_offset);
        self.indices.remove(&index.id);
        trace!(id = index.id, "datafile.free");
        Ok(())
    }

    /// Drops the tail index block when it is not the first block, ends
    /// exactly at `file_end`, and all of its slots are free. Returns the new
    /// file end on success.
    fn drop_tail_block(&mut self, file_end: u64) -> Result<Option<u64>> {
        let block_begin = self.last_block_begin;
        if block_begin == FIRST_BLOCK_OFFSET {
            return Ok(None);
        }
        if block_begin + INDEX_BLOCK_SIZE != file_end {
            return Ok(None);
        }
        let slot_range = (block_begin + NEXT_ID_SIZE)..(block_begin + INDEX_BLOCK_SIZE);
        let free_slots = self
            .slots
            .iter()
            .filter(|offset| slot_range.contains(offset))
            .count() as u64;
        if free_slots != INDICES_PER_BLOCK {
            return Ok(None);
        }
        let prev = self.block_before(block_begin)?;
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        io.seek(prev);
        io.put_u64(0);
        io.commit()?;
        self.slots
            .drain_tail_matching(|offset| slot_range.contains(&offset));
        self.last_block_begin = prev;
        debug!(begin = block_begin, "datafile.drop_index_block");
        Ok(Some(block_begin))
    }

    /// Walks the chain from the first block to the block whose next-pointer
    /// is `target`.
    fn block_before(&mut self, target: u64) -> Result<u64> {
        let io = self.io.as_mut().ok_or(StoreError::Closed)?;
        let mut current = FIRST_BLOCK_OFFSET;
        loop {
            io.seek(current);
            io.fill(NEXT_ID_SIZE as usize)?;
            let next = io.take_u64()?;
            if next == target {
                return Ok(current);
            }
            if next == 0 {
                return Err(StoreError::Corruption(format!(
                    "index block {target} unreachable from chain head"
                )));
            }
            current = next;
        }
    }
}

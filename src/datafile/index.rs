use std::fmt;

use crate::model::ItemId;

/// Half-open byte range `[begin, end)` inside the data file.
///
/// Empty intervals (`begin == end`) occur only as the payload location of
/// zero-length items; the free-space map never stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub begin: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(begin: u64, end: u64) -> Self {
        debug_assert!(begin <= end, "inverted interval [{begin}, {end})");
        Self { begin, end }
    }

    /// The zero-length interval used as the payload location of empty items.
    pub const fn empty() -> Self {
        Self { begin: 0, end: 0 }
    }

    pub fn len(&self) -> u64 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Whether `other` lies entirely within this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// Metadata of one stored item: its id, the payload interval, and the file
/// offset of the 24-byte slot recording both.
///
/// An `Index` is immutable; an update that relocates the payload produces a
/// fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub id: ItemId,
    pub interval: Interval,
    pub slot_offset: u64,
}

impl Index {
    pub fn new(id: ItemId, interval: Interval, slot_offset: u64) -> Self {
        Self {
            id,
            interval,
            slot_offset,
        }
    }

    /// Length in bytes of the item's payload.
    pub fn payload_len(&self) -> u64 {
        self.interval.len()
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Index {{ id: {}, data: {}, slot: {} }}",
            self.id, self.interval, self.slot_offset
        )
    }
}

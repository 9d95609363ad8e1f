/// Identifier of one stored item. Ids are handed out monotonically starting
/// at [`StoreOptions::start_id`](crate::StoreOptions) and are never reused.
pub type ItemId = u64;

/// Slots carrying this id are free; the id space starts well above it.
pub const EMPTY_SLOT_ID: ItemId = 0;

//! # stowage
//!
//! An embedded, single-file object store. Values are serialized by a
//! caller-supplied [`ObjectCodec`], persisted as opaque byte payloads in one
//! data file, and addressed by stable 64-bit ids that survive process
//! restart. There is no server, no background thread, and no write-ahead
//! log: every mutating operation ends in a single fsync, and opening a file
//! rebuilds all in-memory state from its bytes alone.
//!
//! ```no_run
//! use stowage::{Store, StoreOptions, StringCodec};
//!
//! fn main() -> stowage::Result<()> {
//!     let mut store = Store::open(StoreOptions::new("items.daf"), StringCodec)?;
//!     let id = store.store(&"Hallo Welt!".to_string())?;
//!     assert_eq!(store.get(id)?, "Hallo Welt!");
//!     store.update(id, &"Auf Wiedersehen!".to_string())?;
//!     store.delete(id)?;
//!     store.close()
//! }
//! ```

#![forbid(unsafe_code)]

/// Payload serialization traits and shipped codecs.
pub mod codec;

/// Open-time configuration.
pub mod config;

/// The data-file engine: on-disk layout, allocation, and durability.
pub mod datafile;

/// Error types.
pub mod error;

/// Item identifiers.
pub mod model;

/// The public store surface: facade, query, cache, and sync wrapper.
pub mod store;

pub use codec::{BytesCodec, JsonCodec, ObjectCodec, StringCodec};
pub use config::StoreOptions;
pub use datafile::DataFile;
pub use error::{Result, StoreError};
pub use model::ItemId;
pub use store::{Query, Store, SyncStore};

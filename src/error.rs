use std::io;

use thiserror::Error;

use crate::model::ItemId;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("no item with id {0}")]
    NotFound(ItemId),
    #[error("precondition violated: {0}")]
    Precondition(String),
    #[error("store is closed")]
    Closed,
    #[error("id space exhausted")]
    IdExhausted,
}

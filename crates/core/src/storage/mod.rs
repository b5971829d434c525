//! Buffered note storage.

pub mod buffer;
pub mod store;

pub use buffer::PendingBuffer;
pub use store::{NoteStore, StoreConfig, NOTE_EXTENSION};

//! gitnotes core library.
//!
//! Buffered note storage on top of a Git working copy: notes are written as
//! files immediately and pushed to the remote in batches by a background
//! flush loop.

pub mod commit_format;
pub mod config;
pub mod errors;
pub mod git;
pub mod models;
pub mod notesaving;
pub mod scheduler;
pub mod shutdown;
pub mod storage;

// Re-exports for convenience.
pub use config::NotesConfig;
pub use notesaving::{NoteAdder, NoteSaver};
pub use scheduler::run_flush_loop;
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use storage::{NoteStore, StoreConfig};

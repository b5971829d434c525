//! Note-saving use case: derive a title for incoming text and store it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::WriteError;
use crate::storage::NoteStore;

/// Anything that can persist a titled note.
pub trait NoteAdder: Send + Sync {
    fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError>;
}

impl NoteAdder for NoteStore {
    fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError> {
        NoteStore::add(self, title, text)
    }
}

impl<T: NoteAdder + ?Sized> NoteAdder for Arc<T> {
    fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError> {
        (**self).add(title, text)
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("can't process empty note")]
    EmptyNote,

    #[error("error while saving note: {0}")]
    Write(#[from] WriteError),
}

/// Turns raw submitted text into a stored note.
pub struct NoteSaver<A> {
    adder: A,
}

impl<A: NoteAdder> NoteSaver<A> {
    pub fn new(adder: A) -> Self {
        Self { adder }
    }

    /// Save `text` under a freshly derived title.
    pub fn save(&self, text: &str) -> Result<PathBuf, SaveError> {
        self.save_at(text, Local::now())
    }

    /// Like [`save`](Self::save) with an explicit timestamp for the title.
    pub fn save_at(&self, text: &str, now: DateTime<Local>) -> Result<PathBuf, SaveError> {
        let text = text.trim();
        if text.is_empty() {
            warn!("empty note received");
            return Err(SaveError::EmptyNote);
        }

        let title = derive_title(now);
        let path = self.adder.add(&title, text)?;
        info!(path = %path.display(), "new note saved");
        Ok(path)
    }
}

/// `note (2025-01-15 10-30-00) 3f2a9c1b`
///
/// The random suffix keeps titles unique when several notes arrive within
/// the same second.
pub fn derive_title(now: DateTime<Local>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("note ({}) {}", now.format("%Y-%m-%d %H-%M-%S"), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAdder {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl NoteAdder for RecordingAdder {
        fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError> {
            if self.fail {
                return Err(WriteError::Io {
                    path: format!("inbox/{title}.md"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.calls.lock().unwrap().push((title.to_string(), text.to_string()));
            Ok(PathBuf::from(format!("inbox/{title}.md")))
        }
    }

    #[test]
    fn test_save_success() {
        let adder = Arc::new(RecordingAdder::default());
        let saver = NoteSaver::new(adder.clone());
        let now = Local.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();

        let path = saver.save_at("  test note content \n", now).unwrap();

        let calls = adder.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.starts_with("note (2025-01-15 10-30-00) "));
        assert_eq!(calls[0].1, "test note content");
        assert_eq!(path, PathBuf::from(format!("inbox/{}.md", calls[0].0)));
    }

    #[test]
    fn test_save_rejects_empty_text() {
        let adder = Arc::new(RecordingAdder::default());
        let saver = NoteSaver::new(adder.clone());
        assert!(matches!(saver.save(" \n\t"), Err(SaveError::EmptyNote)));
        assert!(adder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_save_propagates_write_error() {
        let saver = NoteSaver::new(RecordingAdder { fail: true, ..Default::default() });
        assert!(matches!(saver.save("hello"), Err(SaveError::Write(WriteError::Io { .. }))));
    }

    #[test]
    fn test_titles_are_unique_within_a_second() {
        let now = Local.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap();
        assert_ne!(derive_title(now), derive_title(now));
    }
}

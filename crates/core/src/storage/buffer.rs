//! Ordered set of note paths waiting for the next flush.

use std::path::{Path, PathBuf};

/// Relative paths of notes written to the working copy but not yet pushed.
///
/// Paths keep insertion order and appear at most once. `capacity` is a flush
/// threshold, not a limit: pushes past it are still accepted.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    paths: Vec<PathBuf>,
    capacity: usize,
}

impl PendingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { paths: Vec::with_capacity(capacity), capacity }
    }

    /// Append `path`. Returns `true` when this append made the buffer reach
    /// its capacity exactly.
    ///
    /// A path that is already pending is not appended twice.
    pub fn push(&mut self, path: PathBuf) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.paths.push(path);
        self.paths.len() == self.capacity
    }

    /// Swap the contents out, leaving an empty buffer behind.
    pub fn take(&mut self) -> Vec<PathBuf> {
        std::mem::replace(&mut self.paths, Vec::with_capacity(self.capacity))
    }

    /// Put a failed batch back in front of anything added since it was taken.
    pub fn requeue(&mut self, failed: Vec<PathBuf>) {
        let mut merged: Vec<PathBuf> = failed
            .into_iter()
            .filter(|p| !self.paths.contains(p))
            .collect();
        merged.append(&mut self.paths);
        self.paths = merged;
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_push_signals_exactly_at_capacity() {
        let mut buf = PendingBuffer::with_capacity(3);
        assert!(!buf.push(p("a.md")));
        assert!(!buf.push(p("b.md")));
        assert!(buf.push(p("c.md")));
        // Past the threshold writes are accepted but do not signal again.
        assert!(!buf.push(p("d.md")));
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_push_ignores_duplicates() {
        let mut buf = PendingBuffer::with_capacity(2);
        assert!(!buf.push(p("a.md")));
        assert!(!buf.push(p("a.md")));
        assert_eq!(buf.paths(), &[p("a.md")]);
    }

    #[test]
    fn test_take_preserves_order_and_empties() {
        let mut buf = PendingBuffer::with_capacity(5);
        for name in ["a.md", "b.md", "c.md"] {
            buf.push(p(name));
        }
        let snapshot = buf.take();
        assert_eq!(snapshot, vec![p("a.md"), p("b.md"), p("c.md")]);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 5);
    }

    #[test]
    fn test_requeue_puts_failed_batch_first() {
        let mut buf = PendingBuffer::with_capacity(5);
        buf.push(p("a.md"));
        buf.push(p("b.md"));
        let failed = buf.take();
        buf.push(p("c.md"));
        buf.push(p("a.md"));

        buf.requeue(failed);
        assert_eq!(buf.paths(), &[p("b.md"), p("c.md"), p("a.md")]);
    }
}

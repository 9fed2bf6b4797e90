//! FIFO model of the single shared, rate-limited inbound access link.
//!
//! Files queue here on a cache miss after their propagation delay. The link
//! serves one file at a time, so at most one `DepartQueue` event is ever
//! outstanding for the current head.

use std::collections::VecDeque;

use crate::registry::FileId;

/// Ordered sequence of files waiting on (or crossing) the access link.
#[derive(Debug, Default)]
pub struct AccessQueue {
    files: VecDeque<FileId>,
}

impl AccessQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a file at the tail.
    pub fn push_back(&mut self, file: FileId) {
        self.files.push_back(file);
    }

    /// Removes and returns the head of the queue.
    pub fn pop_front(&mut self) -> Option<FileId> {
        self.files.pop_front()
    }

    /// Returns the current head without removing it.
    pub fn head(&self) -> Option<FileId> {
        self.files.front().copied()
    }

    /// Returns the number of queued files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when no file is queued.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = AccessQueue::new();
        queue.push_back(FileId::new(1));
        queue.push_back(FileId::new(2));
        queue.push_back(FileId::new(3));

        assert_eq!(queue.pop_front(), Some(FileId::new(1)));
        assert_eq!(queue.pop_front(), Some(FileId::new(2)));
        assert_eq!(queue.pop_front(), Some(FileId::new(3)));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_head_does_not_remove() {
        let mut queue = AccessQueue::new();
        queue.push_back(FileId::new(9));

        assert_eq!(queue.head(), Some(FileId::new(9)));
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }
}

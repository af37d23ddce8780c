//! Song request queue
//!
//! Strict FIFO of opaque identifiers: append at the tail, remove from the
//! head. No deduplication and no length limit.

use std::collections::VecDeque;

/// FIFO queue of identifiers waiting to be played
#[derive(Debug, Default, Clone)]
pub struct SongQueue {
    entries: VecDeque<String>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an identifier at the tail
    pub fn enqueue(&mut self, identifier: impl Into<String>) {
        self.entries.push_back(identifier.into());
    }

    /// Remove and return the head, or `None` when empty
    pub fn dequeue(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    /// True iff at least one identifier is waiting
    pub fn has_next(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queue contents, head first
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

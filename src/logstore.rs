//! ==============================================================================
//! logstore.rs - bounded event log shown in the dashboard's logs tab
//! ==============================================================================
//!
//! purpose:
//!     holds status transitions and poll errors in arrival order.
//!     once full, the oldest entry is dropped for each new one.
//!
//! relationships:
//!     - owned by: store.rs (behind its own lock, so clear and append are
//!       serialized against each other and against readers)
//!     - appended by: sampler.rs
//!     - cleared by: api.rs (POST /api/logs/clear)
//!
//! ==============================================================================

use crate::domain::LogEntry;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct LogStore {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// entries oldest first
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::command::TransportStatus;

/// One executed command, stored with its cmdline already redacted.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub cmd: String,
    pub label: Option<String>,
    pub exit_code: i32,
    pub transport: TransportStatus,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Process-scoped, append-only log of executed commands.
///
/// Only two mutators exist: the dispatcher pushes, the caller drains.
/// Push and pop are single-lock atomic so the history stays safe if
/// tasks ever run in parallel.
#[derive(Debug, Default)]
pub struct ShellHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl ShellHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: HistoryEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Return all entries in push order and clear the buffer, atomically.
    #[must_use]
    pub fn pop(&self) -> Vec<HistoryEntry> {
        std::mem::take(
            &mut *self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

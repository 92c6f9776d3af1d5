use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    /// Wall-clock time in the local offset, e.g. `6:05:09 PM`.
    pub local_time: String,
    pub message: String,
    pub severity: Severity,
}

/// Bounded scan lifecycle record, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    offset: FixedOffset,
    next_id: u64,
}

impl ActivityLog {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY + 1),
            offset,
            next_id: 0,
        }
    }

    pub fn append(&mut self, message: impl Into<String>, severity: Severity, now: DateTime<Utc>) {
        self.next_id += 1;
        let local_time = now
            .with_timezone(&self.offset)
            .format("%-I:%M:%S %p")
            .to_string();
        self.entries.push_front(LogEntry {
            id: self.next_id,
            recorded_at: now,
            local_time,
            message: message.into(),
            severity,
        });
        self.entries.truncate(LOG_CAPACITY);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

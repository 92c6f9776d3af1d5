use chrono::{DateTime, Utc};

use crate::{EventId, FailureKind, LogEntry, ScanStage, ScanStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub status: ScanStatus,
    pub stage: Option<ScanStage>,
    pub auto_enabled: bool,
    pub next_scan_at: Option<DateTime<Utc>>,
    pub seconds_until_next: Option<u64>,
    pub credential_present: bool,
    pub last_failure: Option<FailureKind>,
    pub event_count: usize,
    pub events: Vec<EventRowView>,
    pub selected_count: usize,
    pub logs: Vec<LogEntry>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRowView {
    pub id: EventId,
    pub title: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_url: Option<String>,
    pub selected: bool,
}

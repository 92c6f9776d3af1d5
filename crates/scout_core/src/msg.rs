use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::{EventDraft, EventId, ScanFailure, ScanId, ScanStage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for a scan right now.
    ScanClicked { now: DateTime<Utc> },
    /// User flipped the weekly auto-check switch.
    AutoCheckToggled { enabled: bool, now: DateTime<Utc> },
    /// The bearer credential was set or cleared.
    CredentialChanged { present: bool },
    /// One-second wake-up from the ticker.
    Tick { now: DateTime<Utc> },
    /// Engine progress for the running scan.
    ScanProgress { scan_id: ScanId, stage: ScanStage },
    /// Engine completion for a scan.
    ScanFinished {
        scan_id: ScanId,
        outcome: ScanOutcome,
        now: DateTime<Utc>,
    },
    /// User flipped the selection of one event.
    EventToggled(EventId),
    /// User clicked Select All / Deselect All.
    SelectAllClicked,
    /// User cleared the selection.
    SelectionCleared,
    /// User asked for a calendar file. `None` lets the app pick a filename.
    ExportRequested {
        path: Option<PathBuf>,
        now: DateTime<Utc>,
    },
    /// Result of writing a calendar file: event count or error text.
    ExportFinished {
        path: PathBuf,
        result: Result<usize, String>,
        now: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Normalized events from the pipeline; may be empty.
    Found(Vec<EventDraft>),
    Failed(ScanFailure),
}

use std::path::PathBuf;

use crate::{CampusEvent, ScanId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RunScan { scan_id: ScanId, trigger: ScanTrigger },
    /// A next scan became pending; start the one-second ticker.
    StartTicker,
    /// No scan is pending any more; stop the ticker.
    StopTicker,
    ExportCalendar {
        path: Option<PathBuf>,
        events: Vec<CampusEvent>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTrigger {
    Manual,
    Automatic,
}

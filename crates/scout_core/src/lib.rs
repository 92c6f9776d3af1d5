//! Scout core: pure scan scheduling state machine, event store and view-model helpers.
mod activity_log;
mod effect;
mod event;
mod msg;
mod schedule;
mod state;
mod store;
mod update;
mod view_model;

pub use activity_log::{ActivityLog, LogEntry, Severity, LOG_CAPACITY};
pub use effect::{Effect, ScanTrigger};
pub use event::{CampusEvent, DedupKey, EventDraft, EventId};
pub use msg::{Msg, ScanOutcome};
pub use schedule::{
    days_until_reset, next_weekly_boundary, seconds_until, ScheduleConfig, ScheduleState,
};
pub use state::{AppState, FailureKind, ScanFailure, ScanId, ScanStage, ScanStatus};
pub use store::{EventStore, Selection};
pub use update::update;
pub use view_model::{AppViewModel, EventRowView};

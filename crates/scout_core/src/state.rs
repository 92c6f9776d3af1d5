use std::fmt;

use chrono::{DateTime, Utc};

use crate::activity_log::{ActivityLog, Severity};
use crate::schedule::{next_weekly_boundary, seconds_until, ScheduleConfig, ScheduleState};
use crate::store::{EventStore, Selection};
use crate::view_model::{AppViewModel, EventRowView};
use crate::{Effect, EventDraft, ScanTrigger};

pub type ScanId = u64;

pub(crate) const MISSING_CREDENTIAL_MESSAGE: &str = "API key missing. Cannot scan.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStatus {
    #[default]
    Idle,
    Scanning,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Fetching,
    Normalizing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    SourceUnreachable,
    NormalizationFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingCredential => write!(f, "missing credential"),
            FailureKind::SourceUnreachable => write!(f, "source unreachable"),
            FailureKind::NormalizationFailed => write!(f, "normalization failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    status: ScanStatus,
    stage: Option<ScanStage>,
    schedule: ScheduleState,
    config: ScheduleConfig,
    seconds_until_next: Option<u64>,
    credential_present: bool,
    active_scan: Option<ScanId>,
    last_scan_id: ScanId,
    last_failure: Option<FailureKind>,
    store: EventStore,
    selection: Selection,
    log: ActivityLog,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScheduleConfig) -> Self {
        Self {
            config,
            log: ActivityLog::new(config.utc_offset),
            ..Self::default()
        }
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn schedule(&self) -> ScheduleState {
        self.schedule
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn view(&self) -> AppViewModel {
        let events = self
            .store
            .events()
            .iter()
            .map(|event| EventRowView {
                id: event.id,
                title: event.title.clone(),
                location: event.location.clone(),
                description: event.description.clone(),
                start: event.start,
                end: event.end,
                source_url: event.source_url.clone(),
                selected: self.selection.contains(event.id),
            })
            .collect();

        AppViewModel {
            status: self.status,
            stage: self.stage,
            auto_enabled: self.schedule.auto_enabled,
            next_scan_at: self.schedule.next_scan_at,
            seconds_until_next: self.seconds_until_next,
            credential_present: self.credential_present,
            last_failure: self.last_failure,
            event_count: self.store.len(),
            events,
            selected_count: self.selection.len(),
            logs: self.log.entries().cloned().collect(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn append_log(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        now: DateTime<Utc>,
    ) {
        self.log.append(message, severity, now);
        self.mark_dirty();
    }

    pub(crate) fn set_credential_present(&mut self, present: bool) {
        if self.credential_present != present {
            self.credential_present = present;
            self.mark_dirty();
        }
    }

    /// Start a scan unless one is already running. Manual and automatic
    /// triggers share this path.
    pub(crate) fn request_scan(&mut self, trigger: ScanTrigger, now: DateTime<Utc>) -> Vec<Effect> {
        if self.status == ScanStatus::Scanning {
            return Vec::new();
        }
        self.schedule.next_scan_at = None;
        self.seconds_until_next = None;
        self.mark_dirty();

        if !self.credential_present {
            self.status = ScanStatus::Error;
            self.last_failure = Some(FailureKind::MissingCredential);
            self.append_log(MISSING_CREDENTIAL_MESSAGE, Severity::Error, now);
            self.reschedule(now);
            return Vec::new();
        }

        self.last_scan_id += 1;
        let scan_id = self.last_scan_id;
        self.active_scan = Some(scan_id);
        self.status = ScanStatus::Scanning;
        self.stage = Some(ScanStage::Fetching);
        self.append_log("Connecting to event source...", Severity::Info, now);
        vec![Effect::RunScan { scan_id, trigger }]
    }

    pub(crate) fn apply_progress(&mut self, scan_id: ScanId, stage: ScanStage) {
        if self.active_scan == Some(scan_id) && self.stage != Some(stage) {
            self.stage = Some(stage);
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_found(
        &mut self,
        scan_id: ScanId,
        drafts: Vec<EventDraft>,
        now: DateTime<Utc>,
    ) {
        if !self.finish_active(scan_id) {
            return;
        }
        if drafts.is_empty() {
            self.append_log(
                "Analysis complete. No matching free food events found for the coming week.",
                Severity::Info,
                now,
            );
        } else {
            let added = self.store.merge(drafts, now);
            self.selection.prune(&self.store);
            if added > 0 {
                let noun = if added == 1 { "event" } else { "events" };
                self.append_log(
                    format!("Success! Found {added} new {noun} from the event source."),
                    Severity::Success,
                    now,
                );
            } else {
                self.append_log(
                    "Analysis complete. No new unique events found.",
                    Severity::Info,
                    now,
                );
            }
        }
        self.status = ScanStatus::Success;
        self.last_failure = None;
        self.reschedule(now);
    }

    pub(crate) fn apply_failure(
        &mut self,
        scan_id: ScanId,
        failure: ScanFailure,
        now: DateTime<Utc>,
    ) {
        if !self.finish_active(scan_id) {
            return;
        }
        self.append_log(format!("Scan failed: {}", failure.message), Severity::Error, now);
        self.status = ScanStatus::Error;
        self.last_failure = Some(failure.kind);
        self.reschedule(now);
    }

    fn finish_active(&mut self, scan_id: ScanId) -> bool {
        if self.active_scan != Some(scan_id) {
            return false;
        }
        self.active_scan = None;
        self.stage = None;
        self.mark_dirty();
        true
    }

    pub(crate) fn set_auto(&mut self, enabled: bool, now: DateTime<Utc>) {
        if enabled != self.schedule.auto_enabled {
            self.mark_dirty();
        }
        self.schedule.auto_enabled = enabled;
        if !enabled {
            if self.schedule.next_scan_at.take().is_some() {
                self.mark_dirty();
            }
            self.seconds_until_next = None;
            return;
        }
        if self.status != ScanStatus::Scanning && self.schedule.next_scan_at.is_none() {
            self.reschedule(now);
        }
    }

    /// Refresh the countdown and fire the automatic scan once it is due.
    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let Some(next) = self.schedule.next_scan_at else {
            return Vec::new();
        };
        if !self.schedule.auto_enabled || self.status == ScanStatus::Scanning {
            return Vec::new();
        }
        if now >= next {
            return self.request_scan(ScanTrigger::Automatic, now);
        }
        let remaining = Some(seconds_until(next, now));
        if self.seconds_until_next != remaining {
            self.seconds_until_next = remaining;
            self.mark_dirty();
        }
        Vec::new()
    }

    fn reschedule(&mut self, now: DateTime<Utc>) {
        if !self.schedule.auto_enabled {
            return;
        }
        let next = next_weekly_boundary(now, &self.config);
        self.schedule.next_scan_at = Some(next);
        self.seconds_until_next = Some(seconds_until(next, now));
        self.mark_dirty();
    }

    pub(crate) fn toggle_event(&mut self, id: crate::EventId) {
        if self.selection.toggle(id, &self.store) {
            self.mark_dirty();
        }
    }

    pub(crate) fn toggle_all(&mut self) {
        self.selection.toggle_all(&self.store);
        self.mark_dirty();
    }

    pub(crate) fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.mark_dirty();
        }
    }

    /// Events an export covers: the selection, or everything when nothing is selected.
    pub(crate) fn export_candidates(&self) -> Vec<crate::CampusEvent> {
        if self.selection.is_empty() {
            self.store.events().to_vec()
        } else {
            self.selection.selected_events(&self.store)
        }
    }
}

use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use scout_core::{
    update, AppState, Effect, EventDraft, FailureKind, Msg, ScanFailure, ScanOutcome, ScanStage,
    ScanStatus, ScanTrigger, Severity,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scout_logging::initialize_for_tests);
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 28, 12, 0, 0).unwrap()
}

fn ready_state() -> AppState {
    let (state, _) = update(AppState::new(), Msg::CredentialChanged { present: true });
    state
}

fn pizza_night() -> EventDraft {
    EventDraft {
        title: "Pizza Night".to_string(),
        location: "Student Union".to_string(),
        description: "Free pizza for everyone.".to_string(),
        start: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 5, 1, 20, 0, 0).unwrap(),
        source_url: Some("https://heellife.unc.edu/event/X".to_string()),
    }
}

fn start_scan(state: AppState) -> (AppState, u64) {
    let (state, effects) = update(state, Msg::ScanClicked { now: now() });
    let scan_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::RunScan { scan_id, .. } => Some(*scan_id),
            _ => None,
        })
        .expect("run scan effect");
    (state, scan_id)
}

fn connecting_entries(state: &AppState) -> usize {
    state
        .view()
        .logs
        .iter()
        .filter(|entry| entry.message.starts_with("Connecting"))
        .count()
}

#[test]
fn manual_scan_starts_pipeline_and_logs_connecting() {
    init_logging();
    let (mut state, effects) = update(ready_state(), Msg::ScanClicked { now: now() });

    assert_eq!(
        effects,
        vec![Effect::RunScan {
            scan_id: 1,
            trigger: ScanTrigger::Manual
        }]
    );
    let view = state.view();
    assert_eq!(view.status, ScanStatus::Scanning);
    assert_eq!(view.stage, Some(ScanStage::Fetching));
    assert_eq!(view.logs.len(), 1);
    assert_eq!(view.logs[0].severity, Severity::Info);
    assert!(state.consume_dirty());
}

#[test]
fn manual_scan_while_scanning_is_ignored() {
    init_logging();
    let (state, _scan_id) = start_scan(ready_state());
    let before = state.view();

    let (mut next, effects) = update(state, Msg::ScanClicked { now: now() });

    assert!(effects.is_empty());
    assert_eq!(next.view().status, ScanStatus::Scanning);
    assert_eq!(connecting_entries(&next), 1);
    assert_eq!(next.view().logs, before.logs);
    assert!(next.consume_dirty());
    let (mut again, _) = update(next, Msg::ScanClicked { now: now() });
    assert!(!again.consume_dirty());
}

#[test]
fn scan_without_credential_fails_before_any_work() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::ScanClicked { now: now() });

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, ScanStatus::Error);
    assert_eq!(view.last_failure, Some(FailureKind::MissingCredential));
    assert_eq!(view.logs.len(), 1);
    assert_eq!(view.logs[0].severity, Severity::Error);
    assert_eq!(view.logs[0].message, "API key missing. Cannot scan.");
}

#[test]
fn successful_scan_merges_events_and_logs_success() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());
    assert_eq!(state.view().event_count, 0);

    let (state, effects) = update(
        state,
        Msg::ScanFinished {
            scan_id,
            outcome: ScanOutcome::Found(vec![pizza_night()]),
            now: now(),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, ScanStatus::Success);
    assert_eq!(view.stage, None);
    assert_eq!(view.event_count, 1);
    assert_eq!(view.events[0].title, "Pizza Night");
    let successes: Vec<_> = view
        .logs
        .iter()
        .filter(|entry| entry.severity == Severity::Success)
        .collect();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].message.contains("1 new event"));
}

#[test]
fn refetching_the_same_event_adds_nothing() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());
    let (state, _) = update(
        state,
        Msg::ScanFinished {
            scan_id,
            outcome: ScanOutcome::Found(vec![pizza_night()]),
            now: now(),
        },
    );

    let (state, scan_id) = start_scan(state);
    let mut renamed_url = pizza_night();
    renamed_url.source_url = None;
    renamed_url.location = "Another Room".to_string();
    let (state, _) = update(
        state,
        Msg::ScanFinished {
            scan_id,
            outcome: ScanOutcome::Found(vec![renamed_url]),
            now: now(),
        },
    );

    let view = state.view();
    assert_eq!(view.event_count, 1);
    assert_eq!(view.events[0].location, "Student Union");
    assert_eq!(
        view.logs[0].message,
        "Analysis complete. No new unique events found."
    );
    assert_eq!(view.logs[0].severity, Severity::Info);
}

#[test]
fn empty_result_is_a_successful_scan() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());
    let (state, _) = update(
        state,
        Msg::ScanFinished {
            scan_id,
            outcome: ScanOutcome::Found(Vec::new()),
            now: now(),
        },
    );

    let view = state.view();
    assert_eq!(view.status, ScanStatus::Success);
    assert_eq!(view.event_count, 0);
    assert!(view.logs[0].message.contains("No matching free food events"));
}

#[test]
fn pipeline_failure_sets_error_status() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());
    let (state, _) = update(
        state,
        Msg::ScanFinished {
            scan_id,
            outcome: ScanOutcome::Failed(ScanFailure {
                kind: FailureKind::SourceUnreachable,
                message: "no path returned valid data".to_string(),
            }),
            now: now(),
        },
    );

    let view = state.view();
    assert_eq!(view.status, ScanStatus::Error);
    assert_eq!(view.last_failure, Some(FailureKind::SourceUnreachable));
    assert_eq!(view.logs[0].message, "Scan failed: no path returned valid data");
    assert_eq!(view.logs[0].severity, Severity::Error);

    // A later manual scan is allowed from ERROR.
    let (state, effects) = update(state, Msg::ScanClicked { now: now() });
    assert_eq!(effects.len(), 1);
    assert_eq!(state.view().status, ScanStatus::Scanning);
}

#[test]
fn stale_completion_is_ignored() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());
    let before = state.view();

    let (state, _) = update(
        state,
        Msg::ScanFinished {
            scan_id: scan_id + 7,
            outcome: ScanOutcome::Found(vec![pizza_night()]),
            now: now(),
        },
    );

    let view = state.view();
    assert_eq!(view.status, ScanStatus::Scanning);
    assert_eq!(view.event_count, 0);
    assert_eq!(view.logs, before.logs);
}

#[test]
fn progress_moves_stage_for_active_scan_only() {
    init_logging();
    let (state, scan_id) = start_scan(ready_state());

    let (state, _) = update(
        state,
        Msg::ScanProgress {
            scan_id: scan_id + 1,
            stage: ScanStage::Normalizing,
        },
    );
    assert_eq!(state.view().stage, Some(ScanStage::Fetching));

    let (state, _) = update(
        state,
        Msg::ScanProgress {
            scan_id,
            stage: ScanStage::Normalizing,
        },
    );
    assert_eq!(state.view().stage, Some(ScanStage::Normalizing));
}

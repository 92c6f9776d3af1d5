use crate::activity_log::Severity;
use crate::{AppState, Effect, Msg, ScanOutcome};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let was_pending = state.schedule().next_scan_at.is_some();

    let mut effects = match msg {
        Msg::ScanClicked { now } => state.request_scan(crate::ScanTrigger::Manual, now),
        Msg::AutoCheckToggled { enabled, now } => {
            state.set_auto(enabled, now);
            Vec::new()
        }
        Msg::CredentialChanged { present } => {
            state.set_credential_present(present);
            Vec::new()
        }
        Msg::Tick { now } => state.tick(now),
        Msg::ScanProgress { scan_id, stage } => {
            state.apply_progress(scan_id, stage);
            Vec::new()
        }
        Msg::ScanFinished {
            scan_id,
            outcome,
            now,
        } => {
            match outcome {
                ScanOutcome::Found(drafts) => state.apply_found(scan_id, drafts, now),
                ScanOutcome::Failed(failure) => state.apply_failure(scan_id, failure, now),
            }
            Vec::new()
        }
        Msg::EventToggled(id) => {
            state.toggle_event(id);
            Vec::new()
        }
        Msg::SelectAllClicked => {
            state.toggle_all();
            Vec::new()
        }
        Msg::SelectionCleared => {
            state.clear_selection();
            Vec::new()
        }
        Msg::ExportRequested { path, now } => {
            let events = state.export_candidates();
            if events.is_empty() {
                state.append_log("Nothing to export yet.", Severity::Error, now);
                Vec::new()
            } else {
                vec![Effect::ExportCalendar { path, events }]
            }
        }
        Msg::ExportFinished { path, result, now } => {
            match result {
                Ok(count) => {
                    let noun = if count == 1 { "event" } else { "events" };
                    state.append_log(
                        format!("Exported {count} {noun} to {}.", path.display()),
                        Severity::Success,
                        now,
                    );
                }
                Err(err) => {
                    state.append_log(format!("Export failed: {err}"), Severity::Error, now);
                }
            }
            Vec::new()
        }
    };

    // The ticker only runs while a next scan is pending.
    match (was_pending, state.schedule().next_scan_at.is_some()) {
        (false, true) => effects.push(Effect::StartTicker),
        (true, false) => effects.push(Effect::StopTicker),
        _ => {}
    }

    (state, effects)
}

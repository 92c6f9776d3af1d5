//! Plain-text rendering of the view model for the console.

use chrono::FixedOffset;
use scout_core::{AppViewModel, EventRowView, LogEntry, ScanStage, ScanStatus, Severity};

pub fn status_line(view: &AppViewModel, offset: FixedOffset) -> String {
    let status = match (view.status, view.stage) {
        (ScanStatus::Idle, _) => "Idle".to_string(),
        (ScanStatus::Scanning, Some(ScanStage::Fetching)) => {
            "Scanning (fetching listing)".to_string()
        }
        (ScanStatus::Scanning, Some(ScanStage::Normalizing)) => {
            "Scanning (extracting events)".to_string()
        }
        (ScanStatus::Scanning, None) => "Scanning".to_string(),
        (ScanStatus::Success, _) => "Last scan succeeded".to_string(),
        (ScanStatus::Error, _) => match view.last_failure {
            Some(kind) => format!("Last scan failed ({kind})"),
            None => "Last scan failed".to_string(),
        },
    };

    let auto = match (view.auto_enabled, view.next_scan_at) {
        (true, Some(next)) => {
            let at = next.with_timezone(&offset).format("%a %b %-d %-I:%M %p");
            match view.seconds_until_next {
                Some(secs) => format!("on, next scan {at} (in {})", format_countdown(secs)),
                None => format!("on, next scan {at}"),
            }
        }
        (true, None) => "on".to_string(),
        (false, _) => "off".to_string(),
    };

    format!(
        "Status: {status} | Events: {} ({} selected) | Auto: {auto} | API key: {}",
        view.event_count,
        view.selected_count,
        if view.credential_present { "set" } else { "missing" }
    )
}

/// `2d 03:04:05`, or `03:04:05` under a day.
pub fn format_countdown(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

pub fn event_lines(view: &AppViewModel, offset: FixedOffset) -> Vec<String> {
    if view.events.is_empty() {
        return vec!["No events yet. Run 'scan' to look for free food.".to_string()];
    }
    view.events
        .iter()
        .enumerate()
        .map(|(idx, row)| event_line(idx + 1, row, offset))
        .collect()
}

fn event_line(number: usize, row: &EventRowView, offset: FixedOffset) -> String {
    let start = row.start.with_timezone(&offset);
    let end = row.end.with_timezone(&offset);
    let when = if start.date_naive() == end.date_naive() {
        format!("{} - {}", start.format("%a %b %-d %-I:%M %p"), end.format("%-I:%M %p"))
    } else {
        format!(
            "{} - {}",
            start.format("%a %b %-d %-I:%M %p"),
            end.format("%a %b %-d %-I:%M %p")
        )
    };
    let mark = if row.selected { "x" } else { " " };
    format!("[{mark}] {number:>2}. {} | {when} | {}", row.title, row.location)
}

pub fn log_line(entry: &LogEntry) -> String {
    let tag = match entry.severity {
        Severity::Info => "info",
        Severity::Success => " ok ",
        Severity::Error => "FAIL",
    };
    format!("[{}] {tag} {}", entry.local_time, entry.message)
}

/// Oldest first, for reading top to bottom.
pub fn log_lines(view: &AppViewModel) -> Vec<String> {
    if view.logs.is_empty() {
        return vec!["Activity log is empty.".to_string()];
    }
    view.logs.iter().rev().map(log_line).collect()
}

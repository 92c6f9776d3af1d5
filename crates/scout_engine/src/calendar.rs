//! iCalendar documents and calendar-provider quick-add links.

use chrono::{DateTime, Utc};
use url::form_urlencoded;

const PRODID: &str = "-//FoodScout//CampusEvents//EN";
const UID_DOMAIN: &str = "foodscout";
const QUICK_ADD_BASE: &str = "https://calendar.google.com/calendar/render";
const MAX_LINE_OCTETS: usize = 75;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub uid: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_url: Option<String>,
}

/// `YYYYMMDDTHHMMSSZ`
pub fn format_calendar_time(moment: DateTime<Utc>) -> String {
    moment.format("%Y%m%dT%H%M%SZ").to_string()
}

/// A complete `VCALENDAR` with one `VEVENT` per entry, CRLF line endings.
pub fn ics_document(entries: &[CalendarEntry], stamp: DateTime<Utc>) -> String {
    let stamp = format_calendar_time(stamp);
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
    ];
    for entry in entries {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@{UID_DOMAIN}", entry.uid));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART:{}", format_calendar_time(entry.start)));
        lines.push(format!("DTEND:{}", format_calendar_time(entry.end)));
        lines.push(format!("SUMMARY:{}", escape_text(&entry.title)));
        lines.push(format!("DESCRIPTION:{}", escape_text(&entry.description)));
        lines.push(format!("LOCATION:{}", escape_text(&entry.location)));
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Deep link that opens the provider's "add event" form pre-filled.
pub fn quick_add_link(entry: &CalendarEntry) -> String {
    let dates = format!(
        "{}/{}",
        format_calendar_time(entry.start),
        format_calendar_time(entry.end)
    );
    let source = entry.source_url.as_deref().unwrap_or("FoodScout");
    let details = format!("{}\n\nSource: {source}", entry.description);
    let params = [
        ("action", "TEMPLATE"),
        ("text", entry.title.as_str()),
        ("dates", dates.as_str()),
        ("details", details.as_str()),
        ("location", entry.location.as_str()),
        ("trp", "true"),
    ];
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{QUICK_ADD_BASE}?{query}")
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Split a content line into 75-octet pieces joined by CRLF + space.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        // Continuation lines spend one octet on the leading space.
        if width + len > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}

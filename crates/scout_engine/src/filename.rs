use sha2::{Digest, Sha256};

use crate::calendar::{format_calendar_time, CalendarEntry};

/// Default name for an export: `{sanitized_title}--{short_hash}.ics` for one
/// event, `campus-events-{n}.ics` for several.
pub fn export_filename(entries: &[CalendarEntry]) -> String {
    match entries {
        [single] => {
            let sanitized = sanitize_title(&single.title);
            let hash = short_hash(&format!(
                "{}|{}",
                single.title,
                format_calendar_time(single.start)
            ));
            format!("{sanitized}--{hash}.ics")
        }
        many => format!("campus-events-{}.ics", many.len()),
    }
}

fn sanitize_title(input: &str) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    let mut name: String = compacted.trim_matches(&['_', '.'][..]).chars().take(80).collect();
    if name.is_empty() {
        name = "event".to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

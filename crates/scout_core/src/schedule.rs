use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeDelta, Utc, Weekday};

/// Calendar rules for the recurring weekly scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Weekday on which automatic scans fire.
    pub reset_day: Weekday,
    /// Offset of the local wall clock; day boundaries are taken in it.
    pub utc_offset: FixedOffset,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reset_day: Weekday::Sun,
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleState {
    pub auto_enabled: bool,
    pub next_scan_at: Option<DateTime<Utc>>,
}

/// Whole days from `today` to the next `reset_day`, in `1..=7`.
///
/// On the reset day itself the answer is a full week so an automatic scan
/// never fires the moment it is scheduled.
pub fn days_until_reset(today: Weekday, reset_day: Weekday) -> u32 {
    let today = today.num_days_from_monday();
    let reset = reset_day.num_days_from_monday();
    match (7 + reset - today) % 7 {
        0 => 7,
        days => days,
    }
}

/// The moment the next automatic scan is due: `now` plus the day offset to
/// the upcoming reset day in the local calendar.
pub fn next_weekly_boundary(now: DateTime<Utc>, config: &ScheduleConfig) -> DateTime<Utc> {
    let today = now.with_timezone(&config.utc_offset).weekday();
    let days = days_until_reset(today, config.reset_day);
    now + TimeDelta::days(i64::from(days))
}

/// Seconds left until `next`, rounded up and clamped at zero.
pub fn seconds_until(next: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (next - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis as u64).div_ceil(1000)
    }
}

//! # Timestamp Layout
//!
//! Upload metadata carries its timestamps as text in the classic Unix `date`
//! layout:
//!
//! ```text
//! Mon Jan  2 15:04:05 MST 2006
//! ─┬─ ─┬─ ─┬ ───┬──── ─┬─ ─┬──
//!  │   │   │    │      │   └── year
//!  │   │   │    │      └────── zone abbreviation (not interpreted)
//!  │   │   │    └───────────── wall clock time
//!  │   │   └────────────────── space-padded day of month
//!  │   └────────────────────── month abbreviation
//!  └────────────────────────── weekday abbreviation (not interpreted)
//! ```
//!
//! The weekday and zone abbreviations are only checked for shape; a weekday
//! that disagrees with the date is accepted. The remaining fields are parsed
//! with chrono.

use chrono::{DateTime, NaiveDateTime, Utc};

/// chrono layout for the part of a UnixDate timestamp without weekday and zone.
const LAYOUT_DATE_TIME: &str = "%b %e %H:%M:%S %Y";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parses a UnixDate timestamp (`Mon Jan  2 15:04:05 MST 2006`).
///
/// Returns a human-readable reason on failure.
pub fn parse_unix_date(value: &str) -> Result<NaiveDateTime, String> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(format!(
            "expected 6 fields like 'Mon Jan  2 15:04:05 MST 2006', got {}",
            parts.len()
        ));
    }

    let weekday = parts[0];
    if !WEEKDAYS.contains(&weekday) {
        return Err(format!("'{}' is not a weekday abbreviation", weekday));
    }

    let zone = parts[4];
    if !is_zone_abbreviation(zone) {
        return Err(format!("'{}' is not a time zone abbreviation", zone));
    }

    let date_time = format!("{} {} {} {}", parts[1], parts[2], parts[3], parts[5]);
    NaiveDateTime::parse_from_str(&date_time, LAYOUT_DATE_TIME).map_err(|e| e.to_string())
}

/// Formats an instant in the UnixDate layout, always in UTC.
pub fn format_unix_date(instant: DateTime<Utc>) -> String {
    instant.format("%a %b %e %H:%M:%S UTC %Y").to_string()
}

/// Current time in the UnixDate layout.
pub fn now_unix_date() -> String {
    format_unix_date(Utc::now())
}

fn is_zone_abbreviation(zone: &str) -> bool {
    zone.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && zone
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}

//! Timestamp parsing and local-day arithmetic for event records.
//!
//! Records carry either an exact instant (`Z` or an explicit offset) or a wall-clock
//! time with no offset. Wall-clock times are read in the configured zone, the same
//! way the host application would read them.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a record timestamp into an instant. Returns None when unparseable.
///
/// - RFC 3339 (`2025-09-10T17:00:00Z`, `2025-09-10T13:00:00-04:00`): exact instant
/// - `2025-09-10T17:00[:00]`: wall-clock time in `zone`
/// - `2025-09-10`: midnight in `zone`
pub fn parse_timestamp(value: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return resolve_local(naive, zone);
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| resolve_local(date.and_time(chrono::NaiveTime::MIN), zone))
}

/// Midnight at the start of the local calendar day containing `instant`.
pub fn local_midnight(instant: DateTime<Utc>, zone: Tz) -> DateTime<Utc> {
    let date = instant.with_timezone(&zone).date_naive();
    resolve_local(date.and_time(chrono::NaiveTime::MIN), zone).unwrap_or(instant)
}

/// Map a wall-clock time in `zone` to an instant.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a DST gap
/// are pushed forward by an hour.
pub fn resolve_local(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

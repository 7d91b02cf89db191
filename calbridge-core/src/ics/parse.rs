//! VEVENT to input-record conversion using the icalendar crate's parser.

use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::constants::NO_TITLE;
use crate::error::{BridgeError, BridgeResult};
use crate::record::EventRecord;
use crate::timestamp::resolve_local;

const FLOATING_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Records extracted from one calendar, plus how many VEVENTs were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedCalendar {
    pub events: Vec<EventRecord>,
    pub skipped: usize,
}

/// A start or end as read from the feed, before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Moment {
    Date(NaiveDate),
    Utc(DateTime<Utc>),
    Floating(NaiveDateTime),
}

impl Moment {
    fn format(self) -> String {
        match self {
            Moment::Date(d) => d.format("%Y-%m-%d").to_string(),
            Moment::Utc(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            Moment::Floating(naive) => naive.format(FLOATING_FORMAT).to_string(),
        }
    }

    fn shifted(self, by: Duration) -> Moment {
        match self {
            Moment::Date(d) => Moment::Date(d + by),
            Moment::Utc(dt) => Moment::Utc(dt + by),
            Moment::Floating(naive) => Moment::Floating(naive + by),
        }
    }
}

/// Convert every VEVENT of an ICS document into an input record.
///
/// Events without a UID or a readable DTSTART are skipped and counted.
pub fn convert_calendar(content: &str) -> BridgeResult<ConvertedCalendar> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| BridgeError::Input(format!("Invalid calendar: {e}")))?;

    let default_zone = calendar_zone(&calendar.properties);

    let mut converted = ConvertedCalendar::default();
    for vevent in calendar.components.iter().filter(|c| c.name == "VEVENT") {
        match convert_event(vevent, default_zone) {
            Some(record) => converted.events.push(record),
            None => converted.skipped += 1,
        }
    }

    tracing::debug!(
        events = converted.events.len(),
        skipped = converted.skipped,
        "calendar converted"
    );
    Ok(converted)
}

/// The calendar-wide X-WR-TIMEZONE, when it names a known zone.
pub(super) fn calendar_zone(properties: &[Property]) -> Option<Tz> {
    properties
        .iter()
        .find(|p| p.name == "X-WR-TIMEZONE")
        .and_then(|p| Tz::from_str(p.val.as_ref().trim()).ok())
}

fn convert_event(vevent: &Component, default_zone: Option<Tz>) -> Option<EventRecord> {
    let uid = text_value(vevent.find_prop("UID")?);
    if uid.trim().is_empty() {
        return None;
    }

    let start = read_moment(vevent.find_prop("DTSTART")?, default_zone)?;
    let all_day = matches!(start, Moment::Date(_));

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| read_moment(p, default_zone))
        .or_else(|| match start {
            Moment::Date(_) => Some(start.shifted(Duration::days(1))),
            _ => vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .map(|d| start.shifted(d)),
        });

    let summary = vevent
        .find_prop("SUMMARY")
        .map(text_value)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    Some(EventRecord {
        uid: Some(uid),
        summary: Some(summary),
        location: vevent.find_prop("LOCATION").map(text_value),
        description: vevent.find_prop("DESCRIPTION").map(text_value),
        start: Some(start.format()),
        end: end.map(Moment::format),
        all_day,
    })
}

/// Read a DTSTART/DTEND, converting zoned times to UTC.
///
/// An unknown TZID falls back to the calendar's X-WR-TIMEZONE, which also
/// applies to floating times. Without either the time stays floating.
pub(super) fn read_moment(prop: &Property, default_zone: Option<Tz>) -> Option<Moment> {
    let moment = match DatePerhapsTime::try_from(prop).ok()? {
        DatePerhapsTime::Date(d) => return Some(Moment::Date(d)),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => return Some(Moment::Utc(dt)),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => (naive, None),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            (date_time, Tz::from_str(tzid.trim_matches('"')).ok())
        }
    };

    let (naive, zone) = moment;
    match zone.or(default_zone) {
        Some(zone) => resolve_local(naive, zone).map(Moment::Utc),
        None => Some(Moment::Floating(naive)),
    }
}

pub(super) fn parse_duration(value: &str) -> Option<Duration> {
    let negative = value.starts_with('-');
    let duration = iso8601::duration(value.trim_start_matches(['-', '+'])).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let duration = Duration::from_std(std_duration).ok()?;
    Some(if negative { -duration } else { duration })
}

/// Property value with RFC 5545 text escapes undone.
fn text_value(prop: &Property) -> String {
    unescape_text(prop.val.as_ref()).trim().to_string()
}

pub(super) fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn test_utc_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:abc1\r\nSUMMARY:Game\r\nDTSTART:20250910T170000Z\r\nDTEND:20250910T200000Z\r\nLOCATION:Stadium\\, Field 2\r\nEND:VEVENT\r\n",
        );
        let converted = convert_calendar(&ics).unwrap();
        assert_eq!(converted.skipped, 0);
        assert_eq!(
            converted.events,
            vec![EventRecord {
                uid: Some("abc1".to_string()),
                summary: Some("Game".to_string()),
                location: Some("Stadium, Field 2".to_string()),
                description: None,
                start: Some("2025-09-10T17:00:00Z".to_string()),
                end: Some("2025-09-10T20:00:00Z".to_string()),
                all_day: false,
            }]
        );
    }

    #[test]
    fn test_tzid_converted_to_utc() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:z1\r\nDTSTART;TZID=America/New_York:20250910T130000\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );
        let record = &convert_calendar(&ics).unwrap().events[0];
        assert_eq!(record.start.as_deref(), Some("2025-09-10T17:00:00Z"));
        assert_eq!(record.end.as_deref(), Some("2025-09-10T18:30:00Z"));
        assert_eq!(record.summary.as_deref(), Some("(No title)"));
    }

    #[test]
    fn test_unknown_tzid_uses_calendar_zone() {
        let ics = wrap(
            "X-WR-TIMEZONE:Europe/Berlin\r\nBEGIN:VEVENT\r\nUID:z2\r\nDTSTART;TZID=Custom Zone:20250110T100000\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:z3\r\nDTSTART:20250110T100000\r\nEND:VEVENT\r\n",
        );
        let events = convert_calendar(&ics).unwrap().events;
        assert_eq!(events[0].start.as_deref(), Some("2025-01-10T09:00:00Z"));
        assert_eq!(events[1].start.as_deref(), Some("2025-01-10T09:00:00Z"));
        assert_eq!(events[1].end, None);
    }

    #[test]
    fn test_floating_without_calendar_zone() {
        let ics = wrap("BEGIN:VEVENT\r\nUID:f1\r\nDTSTART:20250110T100000\r\nEND:VEVENT\r\n");
        let record = &convert_calendar(&ics).unwrap().events[0];
        assert_eq!(record.start.as_deref(), Some("2025-01-10T10:00:00"));
    }

    #[test]
    fn test_all_day_event_defaults_to_one_day() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:d1\r\nSUMMARY:Holiday\r\nDTSTART;VALUE=DATE:20251225\r\nEND:VEVENT\r\n",
        );
        let record = &convert_calendar(&ics).unwrap().events[0];
        assert!(record.all_day);
        assert_eq!(record.start.as_deref(), Some("2025-12-25"));
        assert_eq!(record.end.as_deref(), Some("2025-12-26"));
    }

    #[test]
    fn test_events_without_uid_or_start_are_skipped() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nSUMMARY:No uid\r\nDTSTART:20250110T100000Z\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:x\r\nSUMMARY:No start\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:ok\r\nDTSTART:20250110T100000Z\r\nEND:VEVENT\r\n",
        );
        let converted = convert_calendar(&ics).unwrap();
        assert_eq!(converted.skipped, 2);
        assert_eq!(converted.events.len(), 1);
        assert_eq!(converted.events[0].uid.as_deref(), Some("ok"));
    }

    #[test]
    fn test_folded_description_is_unescaped() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:u\r\nDTSTART:20250110T100000Z\r\nDESCRIPTION:Week 1\\nKickoff \r\n at noon\\; bring snacks\r\nEND:VEVENT\r\n",
        );
        let record = &convert_calendar(&ics).unwrap().events[0];
        assert_eq!(
            record.description.as_deref(),
            Some("Week 1\nKickoff at noon; bring snacks")
        );
    }

    #[test]
    fn test_garbage_is_input_error() {
        assert!(matches!(
            convert_calendar("this is not a calendar"),
            Err(BridgeError::Input(_))
        ));
    }
}

//! Rewriting a feed for the host's own ICS importer.
//!
//! Timed DTSTART/DTEND values become UTC and a DURATION becomes an explicit
//! DTEND. Each DESCRIPTION gains the source marker once, so imported events can
//! later be removed by source. Date-only values and every other property and
//! component pass through.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::parser::{self, read_calendar, unfold};
use icalendar::{Calendar, CalendarComponent, Component};

use super::parse::{Moment, calendar_zone, parse_duration, read_moment, unescape_text};
use crate::error::{BridgeError, BridgeResult};
use crate::tag;

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A calendar ready for import, plus what was done to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCalendar {
    pub ics: String,
    pub events: usize,
    /// Events whose description gained the marker in this pass.
    pub tagged: usize,
}

/// Normalize every VEVENT of `content` to UTC and tag it with `source_id`.
///
/// Times without a usable TZID are read in the calendar's X-WR-TIMEZONE, else
/// in `fallback_zone`. X-WR-TIMEZONE itself is dropped from the output.
pub fn prepare_for_import(
    content: &str,
    source_id: &str,
    fallback_zone: Tz,
) -> BridgeResult<PreparedCalendar> {
    let unfolded = unfold(content);
    let parsed = read_calendar(&unfolded)
        .map_err(|e| BridgeError::Input(format!("Invalid calendar: {e}")))?;
    let zone = calendar_zone(&parsed.properties).unwrap_or(fallback_zone);

    let mut calendar = Calendar::empty();
    for prop in parsed.properties {
        if prop.name != "X-WR-TIMEZONE" {
            calendar.append_property(prop);
        }
    }

    let mut events = 0;
    let mut tagged = 0;
    for component in parsed.components {
        if component.name != "VEVENT" {
            calendar.push(component);
            continue;
        }

        events += 1;
        let (event, newly_tagged) = prepare_event(component, source_id, zone);
        if newly_tagged {
            tagged += 1;
        }
        calendar.push(event);
    }

    tracing::debug!(events, tagged, "calendar prepared for import");
    Ok(PreparedCalendar {
        ics: strip_generated_ids(&calendar.to_string()),
        events,
        tagged,
    })
}

fn prepare_event(
    vevent: parser::Component,
    source_id: &str,
    zone: Tz,
) -> (CalendarComponent, bool) {
    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| read_moment(p, Some(zone)));
    // Outer None: no DTEND at all. Inner None: present but unreadable.
    let end = vevent
        .find_prop("DTEND")
        .map(|p| read_moment(p, Some(zone)));
    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| p.val.as_ref().to_string())
        .unwrap_or_default();

    let mut event = match CalendarComponent::from(vevent) {
        CalendarComponent::Event(event) => event,
        other => return (other, false),
    };

    // Setting a property replaces it, TZID parameter included
    if let Some(Moment::Utc(start)) = start {
        event.add_property("DTSTART", utc_value(start));
    }

    match (end, start, duration) {
        (Some(Some(Moment::Utc(end))), _, _) => {
            event.add_property("DTEND", utc_value(end));
        }
        (None, Some(Moment::Utc(start)), Some(duration)) => {
            if let Some(end) = start.checked_add_signed(duration) {
                event.add_property("DTEND", utc_value(end));
                event.remove_property("DURATION");
            }
        }
        _ => {}
    }

    let newly_tagged = !tag::matches(&unescape_text(&description), source_id);
    if newly_tagged {
        let marker = escape_text(&tag::source_marker(source_id));
        let tagged = if description.trim().is_empty() {
            marker
        } else {
            format!("{description}\\n\\n{marker}")
        };
        event.add_property("DESCRIPTION", tagged);
    }

    (event.into(), newly_tagged)
}

/// Drop the DTSTAMP and UID lines the icalendar writer adds to every
/// component. Only VEVENT and VTODO should carry them.
fn strip_generated_ids(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut open: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in ics.lines() {
        if skipping && line.starts_with([' ', '\t']) {
            continue;
        }
        if let Some(name) = line.strip_prefix("BEGIN:") {
            open.push(name);
        }

        let stamped = open
            .last()
            .is_some_and(|name| matches!(*name, "VCALENDAR" | "VEVENT" | "VTODO"));
        skipping = !stamped && (line.starts_with("DTSTAMP:") || line.starts_with("UID:"));
        if line.starts_with("END:") {
            open.pop();
        }
        if skipping {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

fn utc_value(instant: DateTime<Utc>) -> String {
    instant.format(UTC_FORMAT).to_string()
}

/// RFC 5545 TEXT escaping, the inverse of [`unescape_text`].
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
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

    /// Raw value of `name` in the first VEVENT of `ics`.
    fn event_value(ics: &str, name: &str) -> Option<String> {
        let unfolded = unfold(ics);
        let calendar = read_calendar(&unfolded).unwrap();
        let vevent = calendar
            .components
            .iter()
            .find(|c| c.name == "VEVENT")
            .unwrap();
        vevent.find_prop(name).map(|p| p.val.as_ref().to_string())
    }

    #[test]
    fn test_zoned_times_become_utc() {
        let ics = wrap(
            "X-WR-TIMEZONE:Europe/Berlin\r\nBEGIN:VEVENT\r\nUID:z1\r\nDTSTART;TZID=America/New_York:20250910T130000\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );
        let prepared = prepare_for_import(&ics, "nfl-2025", Tz::UTC).unwrap();

        assert_eq!(
            event_value(&prepared.ics, "DTSTART").as_deref(),
            Some("20250910T170000Z")
        );
        assert_eq!(
            event_value(&prepared.ics, "DTEND").as_deref(),
            Some("20250910T183000Z")
        );
        assert_eq!(event_value(&prepared.ics, "DURATION"), None);
        assert!(!prepared.ics.contains("TZID=America/New_York"));
        assert!(!prepared.ics.contains("X-WR-TIMEZONE"));
    }

    #[test]
    fn test_floating_times_use_calendar_then_fallback_zone() {
        let body = "BEGIN:VEVENT\r\nUID:f1\r\nDTSTART:20250110T100000\r\nDTEND:20250110T110000\r\nEND:VEVENT\r\n";

        let with_calendar_zone = wrap(&format!("X-WR-TIMEZONE:Europe/Berlin\r\n{body}"));
        let prepared = prepare_for_import(&with_calendar_zone, "s", Tz::UTC).unwrap();
        assert_eq!(
            event_value(&prepared.ics, "DTSTART").as_deref(),
            Some("20250110T090000Z")
        );

        let prepared =
            prepare_for_import(&wrap(body), "s", chrono_tz::America::New_York).unwrap();
        assert_eq!(
            event_value(&prepared.ics, "DTSTART").as_deref(),
            Some("20250110T150000Z")
        );
        assert_eq!(
            event_value(&prepared.ics, "DTEND").as_deref(),
            Some("20250110T160000Z")
        );
    }

    #[test]
    fn test_marker_is_added_once() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:u1\r\nDTSTART:20250910T170000Z\r\nDESCRIPTION:Week 1\\nKickoff\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:u2\r\nDTSTART:20250911T170000Z\r\nEND:VEVENT\r\n",
        );

        let first = prepare_for_import(&ics, "nfl-2025", Tz::UTC).unwrap();
        assert_eq!(first.events, 2);
        assert_eq!(first.tagged, 2);
        assert_eq!(
            event_value(&first.ics, "DESCRIPTION").as_deref(),
            Some("Week 1\\nKickoff\\n\\n[SRC: nfl-2025]")
        );

        let second = prepare_for_import(&first.ics, "nfl-2025", Tz::UTC).unwrap();
        assert_eq!(second.events, 2);
        assert_eq!(second.tagged, 0);
        assert_eq!(second.ics.matches("[SRC: nfl-2025]").count(), 2);
    }

    #[test]
    fn test_marker_for_another_source_is_not_enough() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:u1\r\nDTSTART:20250910T170000Z\r\nDESCRIPTION:[SRC: mlb]\r\nEND:VEVENT\r\n",
        );
        let prepared = prepare_for_import(&ics, "nfl", Tz::UTC).unwrap();
        assert_eq!(prepared.tagged, 1);
        assert_eq!(
            event_value(&prepared.ics, "DESCRIPTION").as_deref(),
            Some("[SRC: mlb]\\n\\n[SRC: nfl]")
        );
    }

    #[test]
    fn test_all_day_and_other_properties_pass_through() {
        let ics = wrap(
            "BEGIN:VTIMEZONE\r\nTZID:Europe/Berlin\r\nEND:VTIMEZONE\r\nBEGIN:VEVENT\r\nUID:d1\r\nSUMMARY:Holiday\r\nDTSTART;VALUE=DATE:20251225\r\nDTEND;VALUE=DATE:20251226\r\nLOCATION:Home\r\nBEGIN:VALARM\r\nACTION:DISPLAY\r\nTRIGGER:-PT15M\r\nEND:VALARM\r\nEND:VEVENT\r\n",
        );
        let prepared = prepare_for_import(&ics, "holidays", Tz::UTC).unwrap();

        assert_eq!(event_value(&prepared.ics, "DTSTART").as_deref(), Some("20251225"));
        assert_eq!(event_value(&prepared.ics, "DTEND").as_deref(), Some("20251226"));
        assert_eq!(event_value(&prepared.ics, "SUMMARY").as_deref(), Some("Holiday"));
        assert_eq!(event_value(&prepared.ics, "LOCATION").as_deref(), Some("Home"));
        assert!(prepared.ics.contains("BEGIN:VALARM"));
        assert!(prepared.ics.contains("BEGIN:VTIMEZONE"));
        // Only the VEVENT is stamped
        assert_eq!(prepared.ics.matches("DTSTAMP:").count(), 1);
        assert_eq!(
            prepared.ics.lines().filter(|l| l.starts_with("UID:")).collect::<Vec<_>>(),
            vec!["UID:d1"]
        );
        assert!(prepared.ics.contains("PRODID:TEST"));
    }

    #[test]
    fn test_escape_text_roundtrips() {
        let text = "a, b; c\\d\nnext";
        assert_eq!(unescape_text(&escape_text(text)), text);
    }
}

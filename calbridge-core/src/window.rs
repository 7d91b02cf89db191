//! Time window bounding which existing events a scan inspects.

use chrono::{DateTime, Duration, Utc};

/// Inclusive range `[from, to]` of event start instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ScanWindow {
    /// `[now - days, now + days]`, or None when that overflows the calendar.
    pub fn from_now(days: i64) -> Option<Self> {
        ScanWindow::around(Utc::now(), days)
    }

    pub fn around(center: DateTime<Utc>, days: i64) -> Option<Self> {
        let half = Duration::try_days(days)?;
        Some(ScanWindow {
            from: center.checked_sub_signed(half)?,
            to: center.checked_add_signed(half)?,
        })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }

    pub fn from_rfc3339(&self) -> String {
        self.from.to_rfc3339()
    }

    pub fn to_rfc3339(&self) -> String {
        self.to.to_rfc3339()
    }

    /// Parse the wire form used by `list_events`.
    pub fn parse(from: &str, to: &str) -> Result<Self, String> {
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| format!("Invalid window bound '{}'. Expected RFC 3339", s))
        };
        Ok(ScanWindow {
            from: parse(from)?,
            to: parse(to)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_bounds_are_inclusive() {
        let center = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        let window = ScanWindow::around(center, 500).unwrap();

        assert!(window.contains(window.from));
        assert!(window.contains(window.to));
        assert!(!window.contains(window.to + Duration::seconds(1)));
        assert!(!window.contains(window.from - Duration::seconds(1)));
        assert_eq!((window.to - window.from).num_days(), 1000);
    }

    #[test]
    fn test_window_parses_its_wire_form() {
        let window =
            ScanWindow::around(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), 1).unwrap();
        let parsed = ScanWindow::parse(&window.from_rfc3339(), &window.to_rfc3339()).unwrap();
        assert_eq!(parsed, window);
        assert!(ScanWindow::parse("yesterday", &window.to_rfc3339()).is_err());
    }

    #[test]
    fn test_window_too_wide_is_none() {
        let center = Utc.with_ymd_and_hms(2025, 9, 10, 12, 0, 0).unwrap();
        assert!(ScanWindow::around(center, 100_000_000).is_none());
        assert!(ScanWindow::around(center, i64::MAX).is_none());
    }
}

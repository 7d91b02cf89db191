//! Read-only preview of what `remove` would delete.

use anyhow::Result;
use calbridge_core::error::BridgeResult;
use calbridge_core::host::{Host, HostEvent};
use calbridge_core::locator::CalendarLocator;
use calbridge_core::reconcile::ReconciliationScanner;
use calbridge_core::tag;
use calbridge_core::window::ScanWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Session, TargetArgs};

const USAGE: &str = "calbridge scan <calendarName> <occurrenceIndex> <sourceId>";

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TaggedEvent {
    pub id: String,
    pub subject: String,
    pub start: Option<DateTime<Utc>>,
    pub uid: Option<String>,
}

impl From<&HostEvent> for TaggedEvent {
    fn from(event: &HostEvent) -> Self {
        TaggedEvent {
            id: event.id.clone(),
            subject: event.subject.clone(),
            start: event.start,
            uid: tag::uid_in(event.body()).map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub checked: usize,
    pub matched: Vec<TaggedEvent>,
}

pub async fn run(args: &[String], provider: Option<&str>) -> Result<ScanSummary> {
    let target = TargetArgs::parse(args, USAGE)?;
    let session = Session::load(provider)?;
    let window = session.config.scan_window()?;

    Ok(execute(&session.host, &target, window).await?)
}

pub async fn execute<H: Host>(
    host: &H,
    target: &TargetArgs,
    window: ScanWindow,
) -> BridgeResult<ScanSummary> {
    let calendar = CalendarLocator::new(host)
        .resolve(&target.calendar, target.occurrence)
        .await?;

    let outcome = ReconciliationScanner::new(host, window)
        .find_tagged(&calendar, &target.source_id)
        .await;

    Ok(ScanSummary {
        checked: outcome.checked,
        matched: outcome.matched.iter().map(TaggedEvent::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calbridge_core::host::{MemoryHost, NewEvent};
    use calbridge_core::locator::Occurrence;
    use calbridge_core::tag::TagBlock;
    use chrono::Duration;

    #[tokio::test]
    async fn test_scan_reports_without_deleting() {
        let host = MemoryHost::new();
        let cal = host.add_calendar("Sports");
        let start = Utc::now() + Duration::days(10);
        host.seed_event(
            &cal,
            &NewEvent {
                subject: "Game".to_string(),
                location: String::new(),
                content: TagBlock::encode("nfl-2025", "abc1").attach("Week 1"),
                all_day: false,
                start,
                end: start + Duration::hours(3),
            },
        );

        let target = TargetArgs {
            calendar: "Sports".to_string(),
            occurrence: Occurrence::FIRST,
            source_id: "nfl-2025".to_string(),
        };
        let window = ScanWindow::from_now(500).unwrap();
        let summary = execute(&host, &target, window).await.unwrap();

        assert_eq!(summary.checked, 1);
        assert_eq!(summary.matched.len(), 1);
        assert_eq!(summary.matched[0].uid.as_deref(), Some("abc1"));
        assert_eq!(summary.matched[0].start, Some(start));
        assert_eq!(host.events_in(&cal).len(), 1);
    }
}

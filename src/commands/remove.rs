use anyhow::Result;
use calbridge_core::error::BridgeResult;
use calbridge_core::host::Host;
use calbridge_core::locator::CalendarLocator;
use calbridge_core::reconcile::{ReconciliationScanner, RemoveTally};
use calbridge_core::window::ScanWindow;

use super::{Session, TargetArgs};

const USAGE: &str = "calbridge remove <calendarName> <occurrenceIndex> <sourceId>";

pub async fn run(args: &[String], provider: Option<&str>) -> Result<RemoveTally> {
    let target = TargetArgs::parse(args, USAGE)?;
    let session = Session::load(provider)?;
    let window = session.config.scan_window()?;

    Ok(execute(&session.host, &target, window).await?)
}

pub async fn execute<H: Host>(
    host: &H,
    target: &TargetArgs,
    window: ScanWindow,
) -> BridgeResult<RemoveTally> {
    let calendar = CalendarLocator::new(host)
        .resolve(&target.calendar, target.occurrence)
        .await?;
    tracing::info!(calendar = %calendar.name, source = %target.source_id, "removing tagged events");

    Ok(ReconciliationScanner::new(host, window)
        .remove_tagged(&calendar, &target.source_id)
        .await)
}

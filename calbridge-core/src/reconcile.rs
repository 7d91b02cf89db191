//! The remove pass: find and delete everything a source created.
//!
//! There is no stored mapping from source records to host events. The only link
//! is the `[SRC: …]` marker in each body, so removal rescans the calendar over a
//! bounded window and tests every body.
//!
//! Deletion is best effort. A delete the host refuses is skipped silently and not
//! retried, and `deleted` only counts calls the host accepted.

use serde::Serialize;

use crate::host::{CalendarRef, Host, HostEvent};
use crate::tag;
use crate::window::ScanWindow;

/// Result of scanning one calendar for a source's events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub matched: Vec<HostEvent>,
    /// Events inspected in the window, matched or not.
    pub checked: usize,
}

/// Counters for one remove pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveTally {
    pub deleted: usize,
    pub checked: usize,
}

pub struct ReconciliationScanner<'a, H: Host> {
    host: &'a H,
    window: ScanWindow,
}

impl<'a, H: Host> ReconciliationScanner<'a, H> {
    pub fn new(host: &'a H, window: ScanWindow) -> Self {
        ReconciliationScanner { host, window }
    }

    pub fn window(&self) -> &ScanWindow {
        &self.window
    }

    /// Events of `calendar` whose start lies inside the window.
    ///
    /// Prefers a calendar-scoped query; if the host can't do that, filters the
    /// global listing by calendar id. If neither works the calendar looks empty.
    pub async fn events_in_window(&self, calendar: &CalendarRef) -> Vec<HostEvent> {
        let events = match self.host.list_events(calendar, &self.window).await {
            Ok(events) => events,
            Err(scoped) => {
                tracing::debug!(error = %scoped, "calendar-scoped listing failed, using global listing");
                match self.host.list_all_events(&self.window).await {
                    Ok(all) => all
                        .into_iter()
                        .filter(|e| e.calendar_id == calendar.id)
                        .collect(),
                    Err(e) => {
                        tracing::debug!(error = %e, "global listing failed");
                        Vec::new()
                    }
                }
            }
        };

        // The host's own range filter isn't trusted
        events
            .into_iter()
            .filter(|e| e.start.is_some_and(|start| self.window.contains(start)))
            .collect()
    }

    /// Events in the window whose body carries `source_id`'s marker.
    pub async fn find_tagged(&self, calendar: &CalendarRef, source_id: &str) -> ScanOutcome {
        let events = self.events_in_window(calendar).await;
        let checked = events.len();
        let matched = events
            .into_iter()
            .filter(|e| tag::matches(e.body(), source_id))
            .collect();

        ScanOutcome { matched, checked }
    }

    /// Delete every event in the window attributed to `source_id`.
    pub async fn remove_tagged(&self, calendar: &CalendarRef, source_id: &str) -> RemoveTally {
        let outcome = self.find_tagged(calendar, source_id).await;
        let mut deleted = 0;

        for event in &outcome.matched {
            match self.host.delete_event(event).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::debug!(id = %event.id, error = %e, "delete failed, skipping"),
            }
        }

        tracing::info!(deleted, checked = outcome.checked, "remove pass finished");
        RemoveTally {
            deleted,
            checked: outcome.checked,
        }
    }
}

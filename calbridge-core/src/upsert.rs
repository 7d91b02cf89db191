//! The create pass: turns input records into tagged host events.
//!
//! Despite the name, nothing is ever updated. There is no lookup of an existing
//! event by uid before creating, so running the same batch twice creates every
//! event twice.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::constants::DEFAULT_EVENT_MINUTES;
use crate::host::{CalendarRef, Host, NewEvent};
use crate::record::{EventBatch, EventRecord};
use crate::report::{DiagnosticSink, PrivilegeViolation};
use crate::tag::TagBlock;
use crate::timestamp::{local_midnight, parse_timestamp};

/// Counters for one create pass. `created + failed == processed` always holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreateTally {
    pub created: usize,
    pub failed: usize,
    pub processed: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateOptions {
    /// Zone used for wall-clock timestamps and all-day midnight.
    pub zone: Tz,
}

/// Why a record never reached the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Malformed(String),
    MissingUid,
    InvalidStart,
}

pub struct UpsertEngine<'a, H: Host> {
    host: &'a H,
    options: CreateOptions,
}

impl<'a, H: Host> UpsertEngine<'a, H> {
    pub fn new(host: &'a H, options: CreateOptions) -> Self {
        UpsertEngine { host, options }
    }

    /// Create one event per record, in input order.
    ///
    /// A record's failure never stops the batch. Privilege refusals are reported
    /// to `diagnostics` as they happen.
    pub async fn create_batch(
        &self,
        calendar: &CalendarRef,
        batch: &EventBatch,
        source_id: &str,
        diagnostics: &mut impl DiagnosticSink,
    ) -> CreateTally {
        let mut tally = CreateTally {
            processed: batch.len(),
            ..CreateTally::default()
        };

        for (position, record) in batch.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(position, error = %e, "malformed record");
                    tally.failed += 1;
                    continue;
                }
            };

            let event = match self.prepare(&record, source_id) {
                Ok(event) => event,
                Err(rejection) => {
                    tracing::debug!(position, ?rejection, "record rejected");
                    tally.failed += 1;
                    continue;
                }
            };

            match self.host.create_event(calendar, &event).await {
                Ok(id) => {
                    tracing::debug!(position, id = %id, "event created");
                    tally.created += 1;
                }
                Err(e) => {
                    tracing::debug!(position, error = %e, "create failed");
                    if e.is_privilege_violation() {
                        diagnostics.privilege_violation(PrivilegeViolation::for_item(record.title()));
                    }
                    tally.failed += 1;
                }
            }
        }

        tracing::info!(
            created = tally.created,
            failed = tally.failed,
            processed = tally.processed,
            "create pass finished"
        );
        tally
    }

    /// Validate a record and build the event the host should create.
    pub fn prepare(&self, record: &EventRecord, source_id: &str) -> Result<NewEvent, Rejection> {
        let uid = record.trimmed_uid().ok_or(Rejection::MissingUid)?;

        let (start, end) = self.event_span(record)?;

        let content = TagBlock::encode(source_id, uid)
            .attach(record.description.as_deref().unwrap_or_default());

        Ok(NewEvent {
            subject: record.title().to_string(),
            location: record.location.clone().unwrap_or_default(),
            content,
            all_day: record.all_day,
            start,
            end,
        })
    }

    fn event_span(&self, record: &EventRecord) -> Result<(DateTime<Utc>, DateTime<Utc>), Rejection> {
        let zone = self.options.zone;
        let start = record
            .start
            .as_deref()
            .and_then(|s| parse_timestamp(s, zone))
            .ok_or(Rejection::InvalidStart)?;

        if record.all_day {
            let midnight = local_midnight(start, zone);
            return Ok((midnight, midnight + Duration::hours(24)));
        }

        let end = record
            .end
            .as_deref()
            .and_then(|s| parse_timestamp(s, zone))
            .unwrap_or_else(|| start + Duration::minutes(DEFAULT_EVENT_MINUTES));

        Ok((start, end))
    }
}

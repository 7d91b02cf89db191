//! The port through which the core drives the host calendar application.
//!
//! The host's own object model stays behind this trait: the engines only ever
//! enumerate calendars, create an event, list events in a window and delete one.
//! [`ProviderHost`](crate::remote::provider::ProviderHost) speaks to a provider
//! binary; [`MemoryHost`] keeps everything in process.

mod memory;

pub use memory::{Fault, MemoryHost};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HostResult;
use crate::window::ScanWindow;

/// Opaque handle to a host calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    pub id: String,
    pub name: String,
    /// Account the calendar was reached through, None for the global list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// An account (namespace) grouping calendars on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: String,
    pub name: String,
}

/// Fields of an event to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub subject: String,
    pub location: String,
    pub content: String,
    pub all_day: bool,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An event as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    pub id: String,
    pub calendar_id: String,
    #[serde(default)]
    pub subject: String,
    /// Body text; None when the host couldn't read it.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    /// None when the host couldn't read it.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl HostEvent {
    pub fn body(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Capabilities the core needs from a host calendar application.
///
/// Every call is awaited before the next is issued; implementations must not
/// assume any upper bound on how long the host takes to answer.
#[allow(async_fn_in_trait)]
pub trait Host {
    /// The flat, global list of calendars, in host order.
    async fn global_calendars(&self) -> HostResult<Vec<CalendarRef>>;

    /// Accounts that group further calendars, in host order.
    async fn accounts(&self) -> HostResult<Vec<AccountRef>>;

    /// Calendars nested under one account, in host order.
    async fn account_calendars(&self, account: &AccountRef) -> HostResult<Vec<CalendarRef>>;

    /// Create an event in `calendar`, returning the host's id for it.
    async fn create_event(&self, calendar: &CalendarRef, event: &NewEvent) -> HostResult<String>;

    /// Events of one calendar starting within `window`.
    /// Hosts without calendar-scoped queries return [`HostError::Unsupported`](crate::error::HostError::Unsupported).
    async fn list_events(
        &self,
        calendar: &CalendarRef,
        window: &ScanWindow,
    ) -> HostResult<Vec<HostEvent>>;

    /// Events of every calendar starting within `window`.
    async fn list_all_events(&self, window: &ScanWindow) -> HostResult<Vec<HostEvent>>;

    async fn delete_event(&self, event: &HostEvent) -> HostResult<()>;
}

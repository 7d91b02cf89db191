//! Defines the JSON protocol used for communication between calbridge
//! and provider binaries over stdin/stdout.
//!
//! Each call is one request line in, one response line out.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::host::{AccountRef, CalendarRef, HostEvent, NewEvent};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListCalendars,
    ListAccounts,
    ListEvents,
    CreateEvent,
    DeleteEvent,
}

/// Request sent from CLI to provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from provider to CLI.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        match serde_json::to_value(data) {
            Ok(data) => serde_json::json!({ "status": "success", "data": data }).to_string(),
            Err(e) => Response::<()>::error(&format!("Failed to serialize response: {e}")),
        }
    }
}

impl Response<()> {
    pub fn error(msg: &str) -> String {
        serde_json::json!({ "status": "error", "error": msg }).to_string()
    }
}

/// List calendars: the global list, or one account's when `account` is set.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListCalendars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl ProviderCommand for ListCalendars {
    type Response = Vec<CalendarRef>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListAccounts {}

impl ProviderCommand for ListAccounts {
    type Response = Vec<AccountRef>;
    fn command() -> Command {
        Command::ListAccounts
    }
}

/// List events within a time range. Without `calendar_id`, every calendar's.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<HostEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    pub calendar_id: String,
    pub event: NewEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = String; // Host's id for the new event
    fn command() -> Command {
        Command::CreateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

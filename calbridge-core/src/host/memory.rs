//! In-process host keeping calendars and events in memory.
//!
//! Backs the local provider binary (serialized to a JSON state file) and the
//! engine tests, which inject faults to exercise per-record failure handling.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{HostError, HostResult};
use crate::host::{AccountRef, CalendarRef, Host, HostEvent, NewEvent};
use crate::window::ScanWindow;

/// A failure the memory host can be told to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    Denied,
    Unsupported,
    Provider(String),
}

impl Fault {
    fn to_error(&self) -> HostError {
        match self {
            Fault::Denied => HostError::Denied("automation not permitted".to_string()),
            Fault::Unsupported => HostError::Unsupported,
            Fault::Provider(msg) => HostError::Provider(msg.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountEntry {
    account: AccountRef,
    #[serde(default)]
    calendars: Vec<CalendarRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MemoryState {
    #[serde(default)]
    calendars: Vec<CalendarRef>,
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    #[serde(default)]
    events: Vec<HostEvent>,
    #[serde(default)]
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    global_listing: Option<Fault>,
    account_listing: Option<Fault>,
    scoped_listing: Option<Fault>,
    /// Keyed by event subject
    create: HashMap<String, Fault>,
    /// Keyed by event id
    delete: HashMap<String, Fault>,
}

/// A [`Host`] whose calendars live in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: RefCell<MemoryState>,
    faults: RefCell<Faults>,
    create_calls: RefCell<usize>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let state: MemoryState = serde_json::from_str(json)?;
        Ok(MemoryHost {
            state: RefCell::new(state),
            ..Self::default()
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.state.borrow())
    }

    // SETUP:

    /// Add a calendar to the global list.
    pub fn add_calendar(&self, name: &str) -> CalendarRef {
        let mut state = self.state.borrow_mut();
        let calendar = CalendarRef {
            id: state.next_id("cal"),
            name: name.to_string(),
            account: None,
        };
        state.calendars.push(calendar.clone());
        calendar
    }

    /// Add a calendar nested under `account_name`, creating the account if needed.
    pub fn add_account_calendar(&self, account_name: &str, name: &str) -> CalendarRef {
        let mut state = self.state.borrow_mut();
        let id = state.next_id("cal");
        let account = account_entry(&mut state, account_name);
        let calendar = CalendarRef {
            id,
            name: name.to_string(),
            account: Some(account.account.id.clone()),
        };
        account.calendars.push(calendar.clone());
        calendar
    }

    /// Make an existing calendar reachable through `account_name` as well.
    pub fn expose_in_account(&self, account_name: &str, calendar: &CalendarRef) -> CalendarRef {
        let mut state = self.state.borrow_mut();
        let account = account_entry(&mut state, account_name);
        let alias = CalendarRef {
            account: Some(account.account.id.clone()),
            ..calendar.clone()
        };
        account.calendars.push(alias.clone());
        alias
    }

    /// Put an event straight into a calendar, bypassing create faults and counters.
    pub fn seed_event(&self, calendar: &CalendarRef, event: &NewEvent) -> HostEvent {
        let mut state = self.state.borrow_mut();
        let stored = HostEvent {
            id: state.next_id("evt"),
            calendar_id: calendar.id.clone(),
            subject: event.subject.clone(),
            content: Some(event.content.clone()),
            all_day: event.all_day,
            start: Some(event.start),
            end: Some(event.end),
        };
        state.events.push(stored.clone());
        stored
    }

    /// Put a raw host event in place, e.g. one whose body is unreadable.
    pub fn seed_raw_event(&self, event: HostEvent) {
        self.state.borrow_mut().events.push(event);
    }

    pub fn fail_global_listing(&self, fault: Fault) {
        self.faults.borrow_mut().global_listing = Some(fault);
    }

    pub fn fail_account_listing(&self, fault: Fault) {
        self.faults.borrow_mut().account_listing = Some(fault);
    }

    /// Reject calendar-scoped event queries, forcing callers onto the global listing.
    pub fn fail_scoped_listing(&self, fault: Fault) {
        self.faults.borrow_mut().scoped_listing = Some(fault);
    }

    pub fn fail_create_for(&self, subject: &str, fault: Fault) {
        self.faults
            .borrow_mut()
            .create
            .insert(subject.to_string(), fault);
    }

    pub fn fail_delete_for(&self, event_id: &str, fault: Fault) {
        self.faults
            .borrow_mut()
            .delete
            .insert(event_id.to_string(), fault);
    }

    // INSPECTION:

    pub fn events_in(&self, calendar: &CalendarRef) -> Vec<HostEvent> {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| e.calendar_id == calendar.id)
            .cloned()
            .collect()
    }

    /// Number of create calls that reached the host, successful or not.
    pub fn create_calls(&self) -> usize {
        *self.create_calls.borrow()
    }
}

fn account_entry<'a>(state: &'a mut MemoryState, account_name: &str) -> &'a mut AccountEntry {
    let position = match state
        .accounts
        .iter()
        .position(|a| a.account.name == account_name)
    {
        Some(position) => position,
        None => {
            let account = AccountRef {
                id: state.next_id("acct"),
                name: account_name.to_string(),
            };
            state.accounts.push(AccountEntry {
                account,
                calendars: Vec::new(),
            });
            state.accounts.len() - 1
        }
    };
    &mut state.accounts[position]
}

fn in_window(event: &HostEvent, window: &ScanWindow) -> bool {
    event.start.is_some_and(|start| window.contains(start))
}

impl Host for MemoryHost {
    async fn global_calendars(&self) -> HostResult<Vec<CalendarRef>> {
        if let Some(fault) = &self.faults.borrow().global_listing {
            return Err(fault.to_error());
        }
        Ok(self.state.borrow().calendars.clone())
    }

    async fn accounts(&self) -> HostResult<Vec<AccountRef>> {
        Ok(self
            .state
            .borrow()
            .accounts
            .iter()
            .map(|a| a.account.clone())
            .collect())
    }

    async fn account_calendars(&self, account: &AccountRef) -> HostResult<Vec<CalendarRef>> {
        if let Some(fault) = &self.faults.borrow().account_listing {
            return Err(fault.to_error());
        }
        self.state
            .borrow()
            .accounts
            .iter()
            .find(|a| a.account.id == account.id)
            .map(|a| a.calendars.clone())
            .ok_or_else(|| HostError::NotFound(format!("account {}", account.id)))
    }

    async fn create_event(&self, calendar: &CalendarRef, event: &NewEvent) -> HostResult<String> {
        *self.create_calls.borrow_mut() += 1;
        if let Some(fault) = self.faults.borrow().create.get(&event.subject) {
            return Err(fault.to_error());
        }

        let known = {
            let state = self.state.borrow();
            state.calendars.iter().any(|c| c.id == calendar.id)
                || state
                    .accounts
                    .iter()
                    .any(|a| a.calendars.iter().any(|c| c.id == calendar.id))
        };
        if !known {
            return Err(HostError::NotFound(format!("calendar {}", calendar.id)));
        }

        Ok(self.seed_event(calendar, event).id)
    }

    async fn list_events(
        &self,
        calendar: &CalendarRef,
        window: &ScanWindow,
    ) -> HostResult<Vec<HostEvent>> {
        if let Some(fault) = &self.faults.borrow().scoped_listing {
            return Err(fault.to_error());
        }
        Ok(self
            .events_in(calendar)
            .into_iter()
            .filter(|e| in_window(e, window))
            .collect())
    }

    async fn list_all_events(&self, window: &ScanWindow) -> HostResult<Vec<HostEvent>> {
        Ok(self
            .state
            .borrow()
            .events
            .iter()
            .filter(|e| in_window(e, window))
            .cloned()
            .collect())
    }

    async fn delete_event(&self, event: &HostEvent) -> HostResult<()> {
        if let Some(fault) = self.faults.borrow().delete.get(&event.id) {
            return Err(fault.to_error());
        }
        let mut state = self.state.borrow_mut();
        let before = state.events.len();
        state.events.retain(|e| e.id != event.id);
        if state.events.len() == before {
            return Err(HostError::NotFound(format!("event {}", event.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_event(subject: &str) -> NewEvent {
        let start = Utc.with_ymd_and_hms(2025, 9, 10, 17, 0, 0).unwrap();
        NewEvent {
            subject: subject.to_string(),
            location: String::new(),
            content: "[SRC: test]\n[ICSUID: 1]".to_string(),
            all_day: false,
            start,
            end: start + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_state_survives_json_roundtrip() {
        let host = MemoryHost::new();
        let cal = host.add_calendar("Sports");
        host.add_account_calendar("Exchange", "Sports");
        host.create_event(&cal, &sample_event("Game")).await.unwrap();

        let restored = MemoryHost::from_json(&host.to_json().unwrap()).unwrap();
        assert_eq!(restored.events_in(&cal).len(), 1);
        assert_eq!(restored.global_calendars().await.unwrap(), vec![cal]);
        assert_eq!(restored.accounts().await.unwrap().len(), 1);

        // Ids keep counting from where the saved state left off
        let next = restored.add_calendar("Other");
        assert_ne!(next.id, restored.global_calendars().await.unwrap()[0].id);
    }

    #[tokio::test]
    async fn test_account_without_calendars_loads() {
        let json = r#"{"accounts":[{"account":{"id":"acct-1","name":"Exchange"}}]}"#;
        let host = MemoryHost::from_json(json).unwrap();

        let accounts = host.accounts().await.unwrap();
        assert_eq!(accounts[0].name, "Exchange");
        assert!(host.account_calendars(&accounts[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_into_unknown_calendar_fails() {
        let host = MemoryHost::new();
        let ghost = CalendarRef {
            id: "cal-404".to_string(),
            name: "Ghost".to_string(),
            account: None,
        };
        let err = host.create_event(&ghost, &sample_event("Game")).await.unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
        assert_eq!(host.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let host = MemoryHost::new();
        let cal = host.add_calendar("Sports");
        let event = host.seed_event(&cal, &sample_event("Game"));

        host.delete_event(&event).await.unwrap();
        assert!(host.delete_event(&event).await.is_err());
        assert!(host.events_in(&cal).is_empty());
    }

    #[tokio::test]
    async fn test_alias_shares_calendar_identity() {
        let host = MemoryHost::new();
        let cal = host.add_calendar("Sports");
        let alias = host.expose_in_account("iCloud", &cal);

        host.create_event(&alias, &sample_event("Game")).await.unwrap();
        assert_eq!(host.events_in(&cal).len(), 1);
    }
}

//! Resolving a target calendar among same-named calendars.
//!
//! Hosts commonly expose one display name several times (a local "Calendar", an
//! Exchange "Calendar", ...). A calendar is picked by name plus a 1-based
//! occurrence index over every namespace, in host enumeration order. That order
//! is whatever the host returns and may change between runs.

use std::fmt;

use crate::error::{BridgeError, BridgeResult, HostResult};
use crate::host::{CalendarRef, Host};

/// 1-based ordinal among calendars sharing a display name. Never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Occurrence(usize);

impl Occurrence {
    pub const FIRST: Occurrence = Occurrence(1);

    /// Clamp any integer to a valid occurrence (0 and negatives become 1).
    pub fn new(index: i64) -> Self {
        Occurrence(usize::try_from(index).unwrap_or(0).max(1))
    }

    /// Lenient parse of a command-line index: a leading integer is honoured
    /// (`"2nd"` → 2), anything unparseable means the first occurrence.
    pub fn parse_lenient(arg: &str) -> Self {
        let arg = arg.trim();
        let sign_len = usize::from(arg.starts_with(['-', '+']));
        let digits_len = arg[sign_len..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(arg.len() - sign_len);

        arg[..sign_len + digits_len]
            .parse::<i64>()
            .map(Occurrence::new)
            .unwrap_or(Occurrence::FIRST)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct CalendarLocator<'a, H: Host> {
    host: &'a H,
}

impl<'a, H: Host> CalendarLocator<'a, H> {
    pub fn new(host: &'a H) -> Self {
        CalendarLocator { host }
    }

    /// Every calendar the host exposes, global list first, then each account's
    /// calendars. A calendar reachable both ways appears twice.
    ///
    /// A namespace that fails to enumerate contributes nothing. A host that
    /// can't be reached at all is an error.
    pub async fn all_calendars(&self) -> BridgeResult<Vec<CalendarRef>> {
        let mut calendars = or_empty(self.host.global_calendars().await, "global")?;
        let accounts = or_empty(self.host.accounts().await, "accounts")?;

        for account in &accounts {
            let nested = or_empty(self.host.account_calendars(account).await, &account.name)?;
            calendars.extend(nested);
        }

        Ok(calendars)
    }

    /// Calendars named exactly `name`, in occurrence order.
    pub async fn candidates(&self, name: &str) -> BridgeResult<Vec<CalendarRef>> {
        Ok(self
            .all_calendars()
            .await?
            .into_iter()
            .filter(|c| c.name == name)
            .collect())
    }

    pub async fn resolve(&self, name: &str, occurrence: Occurrence) -> BridgeResult<CalendarRef> {
        let candidates = self.candidates(name).await?;
        tracing::debug!(name, matches = candidates.len(), %occurrence, "resolving calendar");

        candidates
            .into_iter()
            .nth(occurrence.get() - 1)
            .ok_or_else(|| BridgeError::CalendarNotFound {
                name: name.to_string(),
                index: occurrence.get(),
            })
    }
}

fn or_empty<T>(listing: HostResult<Vec<T>>, namespace: &str) -> BridgeResult<Vec<T>> {
    match listing {
        Ok(items) => Ok(items),
        Err(e) if e.is_unavailable() => Err(e.into()),
        Err(e) => {
            tracing::debug!(namespace, error = %e, "namespace unavailable");
            Ok(Vec::new())
        }
    }
}

use std::collections::HashMap;

use anyhow::Result;
use calbridge_core::error::BridgeResult;
use calbridge_core::host::{CalendarRef, Host};
use calbridge_core::locator::CalendarLocator;
use serde::Serialize;

use super::Session;

/// A calendar with the occurrence index that selects it by name.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ListedCalendar {
    pub occurrence: usize,
    pub id: String,
    pub name: String,
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarList {
    pub calendars: Vec<ListedCalendar>,
}

pub async fn run(name: Option<&str>, provider: Option<&str>) -> Result<CalendarList> {
    let session = Session::load(provider)?;
    Ok(execute(&session.host, name).await?)
}

pub async fn execute<H: Host>(host: &H, name: Option<&str>) -> BridgeResult<CalendarList> {
    let all = CalendarLocator::new(host).all_calendars().await?;
    Ok(CalendarList {
        calendars: number_occurrences(all, name),
    })
}

fn number_occurrences(calendars: Vec<CalendarRef>, name: Option<&str>) -> Vec<ListedCalendar> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    calendars
        .into_iter()
        .map(|calendar| {
            let count = seen.entry(calendar.name.clone()).or_default();
            *count += 1;
            ListedCalendar {
                occurrence: *count,
                id: calendar.id,
                name: calendar.name,
                account: calendar.account,
            }
        })
        .filter(|listed| name.is_none_or(|n| listed.name == n))
        .collect()
}

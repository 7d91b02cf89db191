//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `calbridge-provider-outlook`) using JSON over stdin/stdout.
//!
//! The protocol is language-agnostic: any executable that speaks it can
//! stand in for a host calendar application. Calls carry no timeout, a host
//! that never answers blocks the run.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;

use crate::error::{HostError, HostResult};
use crate::host::{AccountRef, CalendarRef, Host, HostEvent, NewEvent};
use crate::remote::protocol::{
    Command, CreateEvent, DeleteEvent, ListAccounts, ListCalendars, ListEvents, ProviderCommand,
    Request, Response,
};
use crate::window::ScanWindow;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn binary_name(&self) -> String {
        format!("calbridge-provider-{}", self.0)
    }

    fn binary_path(&self) -> HostResult<PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| HostError::ProviderNotInstalled(binary_name))
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> HostResult<C::Response> {
        self.call_raw(C::command(), cmd).await
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> HostResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| HostError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json =
            serde_json::to_string(&request).map_err(|e| HostError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        tracing::debug!(provider = %self.0, ?command, "calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HostError::Spawn {
                path: binary_path.display().to_string(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(HostError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(HostError::Provider("Provider returned no response".into()));
        }

        parse_response(&response_str)
    }
}

fn parse_response<R: serde::de::DeserializeOwned>(line: &str) -> HostResult<R> {
    let response: Response<R> = serde_json::from_str(line.trim())
        .map_err(|e| HostError::Provider(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(HostError::from_provider_message(error)),
    }
}

/// A [`Host`] backed by a provider binary, one subprocess per call.
#[derive(Clone, Debug)]
pub struct ProviderHost {
    provider: Provider,
}

impl ProviderHost {
    pub fn new(provider: Provider) -> Self {
        ProviderHost { provider }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

impl Host for ProviderHost {
    async fn global_calendars(&self) -> HostResult<Vec<CalendarRef>> {
        self.provider.call(ListCalendars { account: None }).await
    }

    async fn accounts(&self) -> HostResult<Vec<AccountRef>> {
        self.provider.call(ListAccounts {}).await
    }

    async fn account_calendars(&self, account: &AccountRef) -> HostResult<Vec<CalendarRef>> {
        self.provider
            .call(ListCalendars {
                account: Some(account.id.clone()),
            })
            .await
    }

    async fn create_event(&self, calendar: &CalendarRef, event: &NewEvent) -> HostResult<String> {
        self.provider
            .call(CreateEvent {
                calendar_id: calendar.id.clone(),
                event: event.clone(),
            })
            .await
    }

    async fn list_events(
        &self,
        calendar: &CalendarRef,
        window: &ScanWindow,
    ) -> HostResult<Vec<HostEvent>> {
        self.provider
            .call(ListEvents {
                calendar_id: Some(calendar.id.clone()),
                from: window.from_rfc3339(),
                to: window.to_rfc3339(),
            })
            .await
    }

    async fn list_all_events(&self, window: &ScanWindow) -> HostResult<Vec<HostEvent>> {
        self.provider
            .call(ListEvents {
                calendar_id: None,
                from: window.from_rfc3339(),
                to: window.to_rfc3339(),
            })
            .await
    }

    async fn delete_event(&self, event: &HostEvent) -> HostResult<()> {
        self.provider
            .call(DeleteEvent {
                event_id: event.id.clone(),
            })
            .await
    }
}

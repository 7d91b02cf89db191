//! calbridge-provider-local - file-backed calendar host for calbridge
//!
//! This binary implements the calbridge provider protocol, communicating
//! with calbridge via JSON over stdin/stdout. Calendars and events live in
//! a JSON file:
//!   $CALBRIDGE_LOCAL_STORE, or <data_dir>/calbridge/local-host.json

mod store;

use std::io::{self, BufRead, Write};

use calbridge_core::error::HostError;
use calbridge_core::host::{CalendarRef, Host, HostEvent, MemoryHost};
use calbridge_core::remote::protocol::{
    Command, CreateEvent, DeleteEvent, ListCalendars, ListEvents, Request, Response,
};
use calbridge_core::window::ScanWindow;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use store::LocalStore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter =
        EnvFilter::try_from_env("CALBRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let store = match LocalStore::from_env() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(&store, request).await,
            Err(e) => Response::error(&format!("Failed to parse request: {}", e)),
        };

        if let Err(e) = writeln!(stdout, "{}", response).and_then(|_| stdout.flush()) {
            tracing::error!(error = %e, "failed to write response");
            break;
        }
    }
}

async fn handle_request(store: &LocalStore, request: Request) -> String {
    let host = match store.open() {
        Ok(host) => host,
        Err(e) => return Response::error(&format!("{:#}", e)),
    };

    let response = dispatch(&host, &request).await;

    if matches!(request.command, Command::CreateEvent | Command::DeleteEvent)
        && let Err(e) = store.save(&host)
    {
        return Response::error(&format!("{:#}", e));
    }

    response
}

async fn dispatch(host: &MemoryHost, request: &Request) -> String {
    tracing::debug!(command = ?request.command, "handling request");
    match request.command {
        Command::ListCalendars => handle_list_calendars(host, &request.params).await,
        Command::ListAccounts => respond(host.accounts().await),
        Command::ListEvents => handle_list_events(host, &request.params).await,
        Command::CreateEvent => handle_create_event(host, &request.params).await,
        Command::DeleteEvent => handle_delete_event(host, &request.params).await,
    }
}

fn respond<T: serde::Serialize>(result: Result<T, HostError>) -> String {
    match result {
        Ok(data) => Response::success(data),
        Err(e) => Response::error(&e.to_provider_message()),
    }
}

fn params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, String> {
    serde_json::from_value(params.clone())
        .map_err(|e| Response::error(&format!("Invalid params: {}", e)))
}

/// A handle carrying only an id; the memory host looks everything else up.
fn calendar_handle(id: String) -> CalendarRef {
    CalendarRef {
        id,
        name: String::new(),
        account: None,
    }
}

async fn handle_list_calendars(host: &MemoryHost, raw: &serde_json::Value) -> String {
    let params: ListCalendars = match params(raw) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let Some(account_id) = params.account else {
        return respond(host.global_calendars().await);
    };

    let account = match host.accounts().await {
        Ok(accounts) => accounts.into_iter().find(|a| a.id == account_id),
        Err(e) => return respond::<()>(Err(e)),
    };
    match account {
        Some(account) => respond(host.account_calendars(&account).await),
        None => respond::<()>(Err(HostError::NotFound(format!("account {account_id}")))),
    }
}

async fn handle_list_events(host: &MemoryHost, raw: &serde_json::Value) -> String {
    let params: ListEvents = match params(raw) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let window = match ScanWindow::parse(&params.from, &params.to) {
        Ok(w) => w,
        Err(e) => return Response::error(&e),
    };

    match params.calendar_id {
        Some(id) => respond(host.list_events(&calendar_handle(id), &window).await),
        None => respond(host.list_all_events(&window).await),
    }
}

async fn handle_create_event(host: &MemoryHost, raw: &serde_json::Value) -> String {
    let params: CreateEvent = match params(raw) {
        Ok(p) => p,
        Err(response) => return response,
    };

    respond(
        host.create_event(&calendar_handle(params.calendar_id), &params.event)
            .await,
    )
}

async fn handle_delete_event(host: &MemoryHost, raw: &serde_json::Value) -> String {
    let params: DeleteEvent = match params(raw) {
        Ok(p) => p,
        Err(response) => return response,
    };

    let event = HostEvent {
        id: params.event_id,
        calendar_id: String::new(),
        subject: String::new(),
        content: None,
        all_day: false,
        start: None,
        end: None,
    };
    respond(host.delete_event(&event).await)
}

mod commands;
mod logging;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use calbridge_core::error::BridgeError;
use calbridge_core::report::ResultReporter;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "calbridge")]
#[command(about = "Push tagged events into a host calendar and remove them again by source")]
struct Cli {
    /// Host provider to use (overrides `provider` in config.toml)
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create events from a JSON file: <jsonPath> <calendarName> <occurrenceIndex> <categoryIgnored> <sourceId>
    Create {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Delete every event tagged with a source: <calendarName> <occurrenceIndex> <sourceId>
    Remove {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List the events `remove` would delete: <calendarName> <occurrenceIndex> <sourceId>
    Scan {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// List host calendars with their occurrence index
    Calendars {
        /// Only show calendars with this exact name
        name: Option<String>,
    },
    /// Convert an .ics file or URL into create input: <icsFileOrUrl> <outputJsonPath>
    Convert {
        /// Write a UTC-normalized, source-tagged .ics for the host's importer
        /// instead: <icsFileOrUrl> <sourceId> <outputIcsPath>
        #[arg(long)]
        ics: bool,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let provider = cli.provider.as_deref();
    let mut reporter = ResultReporter::new(io::stdout());

    match cli.command {
        Commands::Create { args } => {
            let result = commands::create::run(&args, provider, &mut reporter).await;
            finish(reporter, result)
        }
        Commands::Remove { args } => finish(reporter, commands::remove::run(&args, provider).await),
        Commands::Scan { args } => finish(reporter, commands::scan::run(&args, provider).await),
        Commands::Calendars { name } => {
            finish(reporter, commands::calendars::run(name.as_deref(), provider).await)
        }
        Commands::Convert { ics: false, args } => {
            finish(reporter, commands::convert::run(&args).await)
        }
        Commands::Convert { ics: true, args } => {
            finish(reporter, commands::convert::run_ics(&args).await)
        }
    }
}

/// Write the terminal JSON line and pick the exit status.
fn finish<W: Write, T: Serialize>(reporter: ResultReporter<W>, result: Result<T>) -> ExitCode {
    let (written, status) = match result {
        Ok(summary) => (reporter.success(&summary), ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            (reporter.failure(&format!("{e:#}")), exit_status(&e))
        }
    };

    match written {
        Ok(_) => status,
        Err(e) => {
            tracing::error!(error = %e, "could not write result");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<BridgeError>() {
        Some(BridgeError::Usage(_)) => 2,
        Some(BridgeError::CalendarNotFound { .. }) => 3,
        _ => 1,
    }
}

fn exit_status(error: &anyhow::Error) -> ExitCode {
    ExitCode::from(exit_code(error))
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use calbridge_core::error::BridgeResult;
use calbridge_core::host::Host;
use calbridge_core::locator::{CalendarLocator, Occurrence};
use calbridge_core::record::EventBatch;
use calbridge_core::report::DiagnosticSink;
use calbridge_core::upsert::{CreateOptions, CreateTally, UpsertEngine};

use super::{Session, positional};

const USAGE: &str =
    "calbridge create <jsonPath> <calendarName> <occurrenceIndex> <categoryIgnored> <sourceId>";

#[derive(Debug, PartialEq, Eq)]
pub struct CreateArgs {
    pub json_path: PathBuf,
    pub calendar: String,
    pub occurrence: Occurrence,
    pub source_id: String,
}

impl CreateArgs {
    pub fn parse(args: &[String]) -> BridgeResult<Self> {
        // The fourth argument is a category; events are never categorized
        let [json_path, calendar, occurrence, _category, source_id] = positional::<5>(args, USAGE)?;
        Ok(CreateArgs {
            json_path: PathBuf::from(json_path),
            calendar: calendar.to_string(),
            occurrence: Occurrence::parse_lenient(occurrence),
            source_id: source_id.to_string(),
        })
    }
}

pub async fn run(
    args: &[String],
    provider: Option<&str>,
    diagnostics: &mut impl DiagnosticSink,
) -> Result<CreateTally> {
    let args = CreateArgs::parse(args)?;
    let session = Session::load(provider)?;
    let options = CreateOptions {
        zone: session.config.zone()?,
    };

    Ok(execute(&session.host, &args, options, diagnostics).await?)
}

/// Load the batch, find the target calendar and run the create pass.
pub async fn execute<H: Host>(
    host: &H,
    args: &CreateArgs,
    options: CreateOptions,
    diagnostics: &mut impl DiagnosticSink,
) -> BridgeResult<CreateTally> {
    let batch = EventBatch::load(Path::new(&args.json_path))?;
    tracing::info!(records = batch.len(), source = %args.source_id, "creating events");

    let calendar = CalendarLocator::new(host)
        .resolve(&args.calendar, args.occurrence)
        .await?;

    Ok(UpsertEngine::new(host, options)
        .create_batch(&calendar, &batch, &args.source_id, diagnostics)
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calbridge_core::error::BridgeError;
    use calbridge_core::host::{Fault, MemoryHost};
    use calbridge_core::report::PrivilegeViolation;
    use calbridge_core::tag;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn options() -> CreateOptions {
        CreateOptions {
            zone: chrono_tz::UTC,
        }
    }

    fn write_input(dir: &tempfile::TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("events.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    fn args_for(path: &Path, calendar: &str, occurrence: i64) -> CreateArgs {
        CreateArgs {
            json_path: path.to_path_buf(),
            calendar: calendar.to_string(),
            occurrence: Occurrence::new(occurrence),
            source_id: "nfl-2025".to_string(),
        }
    }

    #[test]
    fn test_parse_args() {
        let args = CreateArgs::parse(&strings(&["in.json", "Sports", "2", "Games", "nfl-2025"])).unwrap();
        assert_eq!(args.json_path, PathBuf::from("in.json"));
        assert_eq!(args.calendar, "Sports");
        assert_eq!(args.occurrence.get(), 2);
        assert_eq!(args.source_id, "nfl-2025");
    }

    #[test]
    fn test_four_args_is_usage_error() {
        let err = CreateArgs::parse(&strings(&["in.json", "Sports", "1", "Games"])).unwrap_err();
        assert!(matches!(err, BridgeError::Usage(_)));
        assert!(err.to_string().starts_with("Usage: calbridge create <jsonPath>"));
    }

    #[tokio::test]
    async fn test_creates_into_second_same_named_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(
            &dir,
            r#"{"events":[{"uid":"abc1","summary":"Game","start":"2025-09-10T17:00:00Z"}]}"#,
        );
        let host = MemoryHost::new();
        let first = host.add_calendar("Sports");
        let second = host.add_account_calendar("Exchange", "Sports");

        let tally = execute(&host, &args_for(&path, "Sports", 2), options(), &mut Vec::new())
            .await
            .unwrap();

        assert_eq!(tally, CreateTally { created: 1, failed: 0, processed: 1 });
        assert!(host.events_in(&first).is_empty());
        let created = host.events_in(&second);
        assert!(tag::matches(created[0].body(), "nfl-2025"));
        assert_eq!(tag::uid_in(created[0].body()), Some("abc1"));
    }

    #[tokio::test]
    async fn test_missing_calendar_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(&dir, r#"{"events":[{"uid":"a","start":"2025-01-01"}]}"#);
        let host = MemoryHost::new();
        host.add_calendar("Work");

        let err = execute(&host, &args_for(&path, "Sports", 1), options(), &mut Vec::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Calendar \"Sports\" (#1) not found");
        assert_eq!(host.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_input_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let host = MemoryHost::new();
        host.add_calendar("Sports");

        let missing = dir.path().join("missing.json");
        let err = execute(&host, &args_for(&missing, "Sports", 1), options(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Input(_)));

        let invalid = write_input(&dir, "{ nope");
        let err = execute(&host, &args_for(&invalid, "Sports", 1), options(), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Input(_)));
    }

    #[tokio::test]
    async fn test_privilege_refusals_reach_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_input(
            &dir,
            r#"{"events":[{"uid":"a","summary":"Game","start":"2025-09-10T17:00:00Z"}]}"#,
        );
        let host = MemoryHost::new();
        host.add_calendar("Sports");
        host.fail_create_for("Game", Fault::Denied);
        let mut diagnostics: Vec<PrivilegeViolation> = Vec::new();

        let tally = execute(&host, &args_for(&path, "Sports", 1), options(), &mut diagnostics)
            .await
            .unwrap();

        assert_eq!(tally.failed, 1);
        assert_eq!(diagnostics.len(), 1);
    }
}

pub mod calendars;
pub mod convert;
pub mod create;
pub mod remove;
pub mod scan;

use anyhow::{Context, Result};
use calbridge_core::config::BridgeConfig;
use calbridge_core::error::{BridgeError, BridgeResult};
use calbridge_core::locator::Occurrence;
use calbridge_core::remote::{Provider, ProviderHost};

/// Everything a host-facing command needs, loaded once per run.
pub struct Session {
    pub config: BridgeConfig,
    pub host: ProviderHost,
}

impl Session {
    pub fn load(provider_override: Option<&str>) -> Result<Self> {
        let config = BridgeConfig::load().context("Failed to load configuration")?;
        let provider = provider_override.unwrap_or(&config.provider);
        tracing::debug!(provider, "using provider");

        Ok(Session {
            host: ProviderHost::new(Provider::from_name(provider)),
            config,
        })
    }
}

/// The first `N` positional arguments, or a usage error when there are fewer.
/// Extra arguments are ignored.
pub fn positional<'a, const N: usize>(args: &'a [String], usage: &str) -> BridgeResult<[&'a str; N]> {
    if args.len() < N {
        return Err(BridgeError::Usage(usage.to_string()));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

/// `<calendarName> <occurrenceIndex> <sourceId>`, shared by remove and scan.
#[derive(Debug, PartialEq, Eq)]
pub struct TargetArgs {
    pub calendar: String,
    pub occurrence: Occurrence,
    pub source_id: String,
}

impl TargetArgs {
    pub fn parse(args: &[String], usage: &str) -> BridgeResult<Self> {
        let [calendar, occurrence, source_id] = positional::<3>(args, usage)?;
        Ok(TargetArgs {
            calendar: calendar.to_string(),
            occurrence: Occurrence::parse_lenient(occurrence),
            source_id: source_id.to_string(),
        })
    }
}

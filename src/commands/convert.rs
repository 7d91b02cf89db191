//! Turn an ICS feed into the JSON document `create` reads, or into a tagged
//! .ics the host can import itself.

use std::path::Path;

use anyhow::{Context, Result};
use calbridge_core::config::BridgeConfig;
use calbridge_core::ics::{convert_calendar, prepare_for_import};
use calbridge_core::record::EventRecord;
use chrono_tz::Tz;
use serde::Serialize;

use super::positional;

const USAGE: &str = "calbridge convert <icsFileOrUrl> <outputJsonPath>";
const ICS_USAGE: &str = "calbridge convert --ics <icsFileOrUrl> <sourceId> <outputIcsPath>";

const USER_AGENT: &str = concat!("calbridge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConvertSummary {
    pub written: usize,
    pub skipped: usize,
}

#[derive(Serialize)]
struct Document<'a> {
    events: &'a [EventRecord],
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub events: usize,
    pub tagged: usize,
}

pub async fn run(args: &[String]) -> Result<ConvertSummary> {
    let [source, output] = positional::<2>(args, USAGE)?;
    let content = read_source(source).await?;
    write_records(&content, Path::new(output))
}

pub async fn run_ics(args: &[String]) -> Result<ImportSummary> {
    let [source, source_id, output] = positional::<3>(args, ICS_USAGE)?;
    let zone = BridgeConfig::load()
        .context("Failed to load configuration")?
        .zone()?;
    let content = read_source(source).await?;
    write_import(&content, source_id, zone, Path::new(output))
}

async fn read_source(source: &str) -> Result<String> {
    match feed_url(source) {
        Some(url) => fetch(&url).await,
        None => std::fs::read_to_string(source).with_context(|| format!("Could not read {source}")),
    }
}

/// The URL to download for `source`, or None when it names a local file.
fn feed_url(source: &str) -> Option<String> {
    if let Some(rest) = source.strip_prefix("webcal://") {
        return Some(format!("https://{rest}"));
    }
    (source.starts_with("https://") || source.starts_with("http://")).then(|| source.to_string())
}

async fn fetch(url: &str) -> Result<String> {
    tracing::info!(url, "downloading calendar");
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

    let text = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?
        .error_for_status()?
        .text()
        .await?;

    Ok(text)
}

fn write_records(content: &str, output: &Path) -> Result<ConvertSummary> {
    let converted = convert_calendar(content)?;

    let json = serde_json::to_string_pretty(&Document {
        events: &converted.events,
    })?;
    std::fs::write(output, json)
        .with_context(|| format!("Could not write {}", output.display()))?;

    Ok(ConvertSummary {
        written: converted.events.len(),
        skipped: converted.skipped,
    })
}

fn write_import(content: &str, source_id: &str, zone: Tz, output: &Path) -> Result<ImportSummary> {
    let prepared = prepare_for_import(content, source_id, zone)?;
    std::fs::write(output, &prepared.ics)
        .with_context(|| format!("Could not write {}", output.display()))?;

    Ok(ImportSummary {
        events: prepared.events,
        tagged: prepared.tagged,
    })
}

//! Input records: the `{ "events": [...] }` document fed to the create pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// One externally-sourced event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Stable external identity; blank values are rejected by the create pass.
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub all_day: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl EventRecord {
    /// The uid with surrounding whitespace removed, None when blank.
    pub fn trimmed_uid(&self) -> Option<&str> {
        self.uid
            .as_deref()
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
    }

    /// Label used in diagnostics and as the created event's subject.
    pub fn title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(crate::constants::NO_TITLE)
    }
}

/// A batch of records as read from the input file.
///
/// Records are kept as raw JSON so that one malformed entry fails on its own
/// instead of rejecting the whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    entries: Vec<serde_json::Value>,
}

impl EventBatch {
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        EventBatch {
            entries: records
                .into_iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect(),
        }
    }

    /// Parse the input document. A missing or null `events` key is an empty batch.
    pub fn from_json(text: &str) -> BridgeResult<Self> {
        let document: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| BridgeError::Input(format!("Invalid JSON: {e}")))?;

        let entries = match document.get("events") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(entries)) => entries.clone(),
            Some(_) => {
                return Err(BridgeError::Input(
                    "\"events\" must be an array".to_string(),
                ));
            }
        };

        Ok(EventBatch { entries })
    }

    pub fn load(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Input(format!("Could not read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in input order; malformed entries come out as `Err`.
    pub fn records(&self) -> impl Iterator<Item = serde_json::Result<EventRecord>> + '_ {
        self.entries
            .iter()
            .map(|entry| EventRecord::deserialize(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_events_key_is_empty_batch() {
        assert!(EventBatch::from_json("{}").unwrap().is_empty());
        assert!(EventBatch::from_json(r#"{"events": null}"#).unwrap().is_empty());
        assert!(EventBatch::from_json("null").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_documents_are_input_errors() {
        assert!(matches!(
            EventBatch::from_json("not json"),
            Err(BridgeError::Input(_))
        ));
        assert!(matches!(
            EventBatch::from_json(r#"{"events": {"uid": "a"}}"#),
            Err(BridgeError::Input(_))
        ));
    }

    #[test]
    fn test_malformed_record_fails_alone() {
        let batch = EventBatch::from_json(
            r#"{"events": [{"uid": 42}, {"uid": "ok", "start": "2025-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        let records: Vec<_> = batch.records().collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_err());
        assert_eq!(records[1].as_ref().unwrap().trimmed_uid(), Some("ok"));
    }

    #[test]
    fn test_record_defaults_and_nulls() {
        let batch = EventBatch::from_json(
            r#"{"events": [{"uid": " abc1 ", "start": "2025-09-10", "end": null, "all_day": null, "extra": 1}]}"#,
        )
        .unwrap();
        let record = batch.records().next().unwrap().unwrap();
        assert_eq!(record.trimmed_uid(), Some("abc1"));
        assert_eq!(record.end, None);
        assert!(!record.all_day);
        assert_eq!(record.title(), "(No title)");
    }

    #[test]
    fn test_blank_uid_and_summary() {
        let record = EventRecord {
            uid: Some("   ".to_string()),
            summary: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(record.trimmed_uid(), None);
        assert_eq!(record.title(), "(No title)");
    }
}

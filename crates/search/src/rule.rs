//! Saved Search (rule) Model

use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output mode that routes each result row to the notification channel
pub const NOTIFY_OUTPUT: &str = "pushbullet";

const SCHEDULE_KEY: &str = "splasch_schedule";
const OUTPUT_KEY: &str = "splasch_output";
const OUTPUT_FIELDS_KEY: &str = "splasch_output_fields";
const SUPPRESS_FIELD_KEY: &str = "splasch_suppress_field";
const SUPPRESS_MINUTES_KEY: &str = "splasch_suppress_minutes";

/// A saved search with its SPLaSCH attributes, decoded once from the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub name: String,
    pub disabled: bool,
    /// Schedule keyword the rule belongs to
    pub schedule: Option<String>,
    /// Output mode; [`NOTIFY_OUTPUT`] dispatches alerts
    pub output: Option<String>,
    /// Comma-separated list of fields to include in alerts
    pub output_fields: Option<String>,
    /// Result field whose value keys the suppression window
    pub suppress_field: Option<String>,
    pub suppress_minutes: u64,
}

impl SavedSearch {
    /// Create an enabled rule with no SPLaSCH attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decode one entry of a `saved/searches` listing.
    ///
    /// Absent or blank optional attributes decode to `None`.
    pub fn from_entry(entry: &Value) -> Result<Self, SearchError> {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::InvalidResponse("saved search without name".into()))?
            .to_string();

        let empty = serde_json::Map::new();
        let content = entry
            .get("content")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        Ok(Self {
            name,
            disabled: content.get("disabled").map(flag).unwrap_or(false),
            schedule: content.get(SCHEDULE_KEY).and_then(text),
            output: content.get(OUTPUT_KEY).and_then(text),
            output_fields: content.get(OUTPUT_FIELDS_KEY).and_then(text),
            suppress_field: content.get(SUPPRESS_FIELD_KEY).and_then(text),
            suppress_minutes: content
                .get(SUPPRESS_MINUTES_KEY)
                .and_then(count)
                .unwrap_or(0),
        })
    }

    /// Whether this rule runs for `keyword`
    pub fn is_scheduled_for(&self, keyword: &str) -> bool {
        !self.disabled && self.schedule.as_deref() == Some(keyword)
    }

    /// Whether result rows are dispatched as alerts
    pub fn notifies(&self) -> bool {
        self.output.as_deref() == Some(NOTIFY_OUTPUT)
    }

    /// Length of the suppression window in seconds
    pub fn suppress_seconds(&self) -> i64 {
        (self.suppress_minutes as i64).saturating_mul(60)
    }
}

/// Build the search string that runs `rule` through `| savedsearch`
pub fn savedsearch_query(rule: &SavedSearch) -> String {
    let mut query = format!(
        "| savedsearch \"{}\"",
        rule.name.replace('\\', "\\\\").replace('"', "\\\"")
    );
    // Alert output needs every field, not only the ones the search displays
    if rule.output.is_some() {
        query.push_str(" | fields *");
    }
    query
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map_or(false, |n| n != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True" | "TRUE"),
        _ => false,
    }
}

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

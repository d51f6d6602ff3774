//! Alert Message Formatting

use serde_json::{Map, Value};

/// Event time field; shown even though it carries the internal prefix
pub const TIME_FIELD: &str = "_time";

/// Prefix of backend-internal fields, hidden from alerts
const INTERNAL_PREFIX: char = '_';

/// Render a result row as `*name: value` lines.
///
/// With `requested_fields` (comma-separated), only those fields are shown;
/// otherwise every field is. Internal fields are dropped in both cases,
/// except [`TIME_FIELD`]. Lines follow the row's key order.
pub fn format_message(row: &Map<String, Value>, requested_fields: Option<&str>) -> String {
    let requested: Option<Vec<&str>> = requested_fields
        .filter(|f| !f.trim().is_empty())
        .map(|f| f.split(',').map(str::trim).collect());

    row.iter()
        .filter(|(name, _)| {
            requested
                .as_ref()
                .map_or(true, |fields| fields.contains(&name.as_str()))
        })
        .filter(|(name, _)| name.as_str() == TIME_FIELD || !name.starts_with(INTERNAL_PREFIX))
        .map(|(name, value)| format!("*{}: {}", name, value_text(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text form of a field value: strings raw, everything else as compact JSON
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_all_fields_hide_internal() {
        let event = row(json!({ "_time": "t0", "a": 1, "_internal": 2 }));
        assert_eq!(format_message(&event, None), "*_time: t0\n*a: 1");
    }

    #[test]
    fn test_requested_fields_only() {
        let event = row(json!({ "_time": "t0", "host": "x", "user": "bob", "count": "3" }));
        assert_eq!(
            format_message(&event, Some("user, host")),
            "*host: x\n*user: bob"
        );
    }

    #[test]
    fn test_requested_internal_field_still_hidden() {
        let event = row(json!({ "_time": "t0", "_raw": "line", "host": "x" }));
        assert_eq!(
            format_message(&event, Some("_raw,_time,host")),
            "*_time: t0\n*host: x"
        );
    }

    #[test]
    fn test_lines_follow_row_order() {
        let event = row(json!({ "z": 1, "_time": "t0", "a": 2 }));
        assert_eq!(format_message(&event, None), "*z: 1\n*_time: t0\n*a: 2");
        assert_eq!(format_message(&event, Some("a,z")), "*z: 1\n*a: 2");
    }

    #[test]
    fn test_blank_request_means_all_fields() {
        let event = row(json!({ "host": "x" }));
        assert_eq!(format_message(&event, Some("  ")), "*host: x");
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("plain")), "plain");
        assert_eq!(value_text(&json!(42)), "42");
        assert_eq!(value_text(&json!(["a", "b"])), r#"["a","b"]"#);
        assert_eq!(value_text(&Value::Null), "");
    }

    proptest! {
        #[test]
        fn prop_never_leaks_internal_fields(
            fields in proptest::collection::btree_map("_?[a-z]{1,6}", "[a-z0-9]{0,6}", 0..8)
        ) {
            let event: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();

            let message = format_message(&event, None);
            let expected = fields
                .keys()
                .filter(|k| k.as_str() == TIME_FIELD || !k.starts_with('_'))
                .count();
            let lines: Vec<&str> = message.lines().filter(|l| !l.is_empty()).collect();

            prop_assert_eq!(lines.len(), expected);
            prop_assert!(lines
                .iter()
                .all(|l| !l.starts_with("*_") || l.starts_with("*_time:")));
        }
    }
}

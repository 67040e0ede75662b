//! Structural validation of inbound documents.
//!
//! Validation never aborts a document: every violation is recorded as a
//! [`ValidationIssue`] and parsing continues with a best-effort value.

pub mod blueprint;
pub mod mechanics;
pub mod sequence;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::casing::canonical_key;

pub use blueprint::{parse_blueprint, parse_blueprint_at};
pub use mechanics::{MechanicConfig, MechanicConfigSet, validate_mechanic_config};
pub use sequence::{
    GameScene, GameSequence, ProgressionType, RevealTrigger, SceneProgress, parse_sequence,
};

/// A single structural violation, always naming the offending field path.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("{path}: required field missing")]
    Missing { path: String },
    #[error("{path}: expected {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("{path}: reference must be a non-empty string")]
    EmptyReference { path: String },
    #[error("{path}: {value} is outside {min}..={max}")]
    OutOfRange {
        path: String,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{path}: {message}")]
    Invalid { path: String, message: String },
    #[error("{path}: {message}")]
    Decode { path: String, message: String },
}

impl SchemaError {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Missing { path }
            | Self::WrongType { path, .. }
            | Self::EmptyReference { path }
            | Self::OutOfRange { path, .. }
            | Self::Invalid { path, .. }
            | Self::Decode { path, .. } => path,
        }
    }

    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every violation found while validating one mechanic config.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{} schema violation(s), first: {}", .0.len(), .0.first().map(ToString::to_string).unwrap_or_default())]
pub struct SchemaErrors(pub Vec<SchemaError>);

/// Serializable diagnostic kept alongside a best-effort parse result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl From<&SchemaError> for ValidationIssue {
    fn from(error: &SchemaError) -> Self {
        let full = error.to_string();
        let path = error.path().to_string();
        let message = full
            .strip_prefix(&format!("{path}: "))
            .map_or_else(|| full.clone(), str::to_string);
        Self { path, message }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Best-effort value plus every issue found while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub issues: Vec<ValidationIssue>,
}

impl<T> Parsed<T> {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Issue collector shared by the parsers.
#[derive(Debug, Default)]
pub(crate) struct IssueSink {
    issues: Vec<ValidationIssue>,
}

impl IssueSink {
    pub(crate) fn push(&mut self, error: &SchemaError) {
        log::warn!(target: "blueprint_core::schema", "{error}");
        self.issues.push(ValidationIssue::from(error));
    }

    pub(crate) fn extend(&mut self, errors: &[SchemaError]) {
        for error in errors {
            self.push(error);
        }
    }

    pub(crate) fn into_vec(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

pub(crate) fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

pub(crate) fn index_path(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Name of a JSON value's type for diagnostics.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn first_present<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
    keys.iter().find_map(|key| {
        map.get_key_value(*key)
            .filter(|(_, value)| !value.is_null())
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// Read a string field, tolerating numeric identifiers.
///
/// Absent and `null` read as `None`; other shapes are reported.
pub(crate) fn read_string(
    map: &Map<String, Value>,
    keys: &[&str],
    prefix: &str,
    sink: &mut IssueSink,
) -> Option<String> {
    let (key, value) = first_present(map, keys)?;
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => {
            sink.push(&SchemaError::WrongType {
                path: join_path(prefix, key),
                expected: "string",
            });
            None
        }
    }
}

/// Read a numeric field, accepting numeric strings.
pub(crate) fn read_number(
    map: &Map<String, Value>,
    keys: &[&str],
    prefix: &str,
    sink: &mut IssueSink,
) -> Option<f64> {
    let (key, value) = first_present(map, keys)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|number| number.is_finite()) {
        Some(number) => Some(number),
        None => {
            sink.push(&SchemaError::WrongType {
                path: join_path(prefix, key),
                expected: "finite number",
            });
            None
        }
    }
}

pub(crate) fn read_bool(
    map: &Map<String, Value>,
    keys: &[&str],
    prefix: &str,
    sink: &mut IssueSink,
) -> Option<bool> {
    let (key, value) = first_present(map, keys)?;
    if let Some(flag) = value.as_bool() {
        return Some(flag);
    }
    sink.push(&SchemaError::WrongType {
        path: join_path(prefix, key),
        expected: "boolean",
    });
    None
}

/// Read an array field; anything but an array is reported and read as empty.
pub(crate) fn read_array<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    sink: &mut IssueSink,
) -> &'a [Value] {
    match map.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            sink.push(&SchemaError::WrongType {
                path: join_path(prefix, key),
                expected: "array",
            });
            &[]
        }
    }
}

/// Unknown sibling fields: every key that is neither consumed nor a
/// snake_case alias of a consumed key.
pub(crate) fn collect_extra(map: &Map<String, Value>, consumed: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| {
            !consumed.contains(&key.as_str()) && !consumed.contains(&canonical_key(key).as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn issue_keeps_path_and_message() {
        let error = SchemaError::EmptyReference {
            path: "sortingConfig.items[0].correctCategoryId".to_string(),
        };
        let issue = ValidationIssue::from(&error);
        assert_eq!(issue.path, "sortingConfig.items[0].correctCategoryId");
        assert_eq!(issue.message, "reference must be a non-empty string");
        assert_eq!(issue.to_string(), error.to_string());
    }

    #[test]
    fn readers_report_wrong_shapes() {
        let map = json!({"id": 7, "x": "12.5", "y": "far", "flag": "yes", "list": {}})
            .as_object()
            .cloned()
            .unwrap();
        let mut sink = IssueSink::default();
        assert_eq!(read_string(&map, &["id"], "zones[0]", &mut sink), Some("7".to_string()));
        assert_eq!(read_number(&map, &["x"], "zones[0]", &mut sink), Some(12.5));
        assert_eq!(read_number(&map, &["y"], "zones[0]", &mut sink), None);
        assert_eq!(read_bool(&map, &["flag"], "zones[0]", &mut sink), None);
        assert!(read_array(&map, "list", "", &mut sink).is_empty());
        let issues = sink.into_vec();
        let paths: Vec<_> = issues.iter().map(|issue| issue.path.as_str()).collect();
        assert_eq!(paths, ["zones[0].y", "zones[0].flag", "list"]);
    }

    #[test]
    fn extra_drops_consumed_aliases() {
        let map = json!({"id": "a", "correct_zone_id": "z", "correctZoneId": "z", "color": "red"})
            .as_object()
            .cloned()
            .unwrap();
        let extra = collect_extra(&map, &["id", "correctZoneId"]);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra["color"], json!("red"));
    }

    #[test]
    fn schema_errors_summarize() {
        let errors = SchemaErrors(vec![SchemaError::Missing {
            path: "sequenceConfig.items".to_string(),
        }]);
        assert_eq!(
            errors.to_string(),
            "1 schema violation(s), first: sequenceConfig.items: required field missing"
        );
    }
}

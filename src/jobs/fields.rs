//! Prioritized field lookup for provider payloads.
//!
//! The provider's payload shape is only partly documented and several
//! spellings have been observed. Each logical value has an ordered list of
//! candidate paths; the first non-empty match wins.

use serde_json::Value;

/// A JSON path as a sequence of object keys.
pub type FieldPath = &'static [&'static str];

/// Job identifier, shared by submit responses and callbacks.
pub const JOB_ID: &[FieldPath] = &[
    &["data", "taskId"],
    &["taskId"],
    &["data", "task_id"],
    &["task_id"],
];

/// Result description inside a callback; often a JSON-encoded string.
pub const RESULT_DESCRIPTION: &[FieldPath] = &[
    &["data", "resultJson"],
    &["data", "result_json"],
    &["data", "result"],
];

/// Output locators inside the parsed result description.
pub const RESULT_REFERENCES: &[FieldPath] = &[&["resultUrls"], &["result_urls"]];

/// Return the first candidate path that resolves to a non-empty value.
pub fn lookup<'a>(value: &'a Value, candidates: &'a [FieldPath]) -> Option<&'a Value> {
    candidates_of(value, candidates).next()
}

/// Extract a job identifier. Strings are trimmed; numeric ids are rendered
/// in decimal.
pub fn job_id(value: &Value) -> Option<String> {
    candidates_of(value, JOB_ID).find_map(|found| match found {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Extract result references, keeping only string entries. Missing or
/// non-list values yield an empty list.
pub fn result_references(description: &Value) -> Vec<String> {
    match lookup(description, RESULT_REFERENCES) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn candidates_of<'a>(
    value: &'a Value,
    candidates: &'a [FieldPath],
) -> impl Iterator<Item = &'a Value> + 'a {
    candidates
        .iter()
        .filter_map(move |path| resolve(value, path))
        .filter(|found| !is_empty(found))
}

fn resolve<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

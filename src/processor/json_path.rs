//! JSON path resolution for backend responses.
//!
//! Resolves dot-notation paths like "result.summary" to values in JSON.
//! Backends disagree on response envelopes, so lookups usually try a list
//! of candidate paths in order.

use serde_json::Value;

/// Resolve a dot-notation path to a value in JSON.
pub fn resolve_json_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(data);
    }

    let mut current = data;
    for part in path.split('.') {
        match current {
            Value::Object(obj) => {
                current = obj.get(part)?;
            }
            Value::Array(arr) => {
                let index: usize = part.parse().ok()?;
                current = arr.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Resolve the first candidate path that exists and is not null.
pub fn resolve_first<'a>(data: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| resolve_json_path(data, path))
        .find(|v| !v.is_null())
}

/// Convert a scalar JSON value to a trimmed string. Arrays and objects
/// are rejected rather than stringified.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

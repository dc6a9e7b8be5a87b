//! Body decoding and field extraction
//!
//! `decode_body` implements the content-type dispatch table. The path
//! helpers pull adapter-declared fields (results, cursor, total) out of a
//! decoded JSON document.

use super::types::{ContentKind, Payload};
use crate::error::{Error, Result};
use serde_json::Value;

// ============================================================================
// Content-Type Dispatch
// ============================================================================

/// Decode a response body according to its declared content type
pub fn decode_body(content_type: Option<&str>, body: &[u8]) -> Result<Payload> {
    if body.is_empty() {
        return Ok(Payload::Empty);
    }

    match ContentKind::from_header(content_type) {
        ContentKind::Json => serde_json::from_slice(body)
            .map(Payload::Json)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}"))),
        ContentKind::Text => String::from_utf8(body.to_vec())
            .map(Payload::Text)
            .map_err(|e| Error::decode(format!("Text body is not valid UTF-8: {e}"))),
        other => Err(Error::decode(format!("Unexpected content type: {other}"))),
    }
}

// ============================================================================
// Path Extraction
// ============================================================================

/// Follow a dotted path (`data.items`, `$.data.items`, `items[0]`, `items[-1]`)
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        // Handle array indexing like "data[0]" or "items[-1]"
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index: i64 = index_str.parse().ok()?;
            let Value::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current)
}

/// Extract a non-negative integer at `path`, accepting numeric strings
pub fn extract_u64(value: &Value, path: &str) -> Option<u64> {
    match extract_path(value, path)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Extract the record list at `path`.
///
/// Returns `Ok(None)` when the path does not resolve to an array. Paths with
/// wildcards are evaluated as JSONPath and always yield a list.
pub fn extract_records(value: &Value, path: Option<&str>) -> Result<Option<Vec<Value>>> {
    let Some(path) = path else {
        return Ok(match value {
            Value::Array(arr) => Some(arr.clone()),
            _ => None,
        });
    };

    if path.contains('*') {
        return extract_with_jsonpath(value, path).map(Some);
    }

    Ok(match extract_path(value, path) {
        Some(Value::Array(arr)) => Some(arr.clone()),
        _ => None,
    })
}

/// Extract records with a JSONPath expression
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}

//! Sensitive-header and sensitive-body-key redaction applied at capture time.

use std::collections::BTreeMap;

use serde_json::Value;

/// Replaces the value of every header in `headers` whose name case-insensitively
/// matches an entry in `filter_headers` with `redact_value`.
pub fn redact_headers(
    headers: &mut BTreeMap<String, Vec<String>>,
    filter_headers: &[String],
    redact_value: &str,
) {
    let lowered: Vec<String> = filter_headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    for (name, values) in headers.iter_mut() {
        if lowered.contains(&name.to_ascii_lowercase()) {
            for v in values.iter_mut() {
                *v = redact_value.to_string();
            }
        }
    }
}

/// Parses `body` as JSON and replaces the value of every object key listed in
/// `filter_keys` (case-sensitive, applied recursively) with `redact_value`.
/// Bodies that don't parse as JSON are returned unchanged.
#[must_use]
pub fn redact_body_json(body: &[u8], filter_keys: &[String], redact_value: &str) -> Vec<u8> {
    if filter_keys.is_empty() {
        return body.to_vec();
    }
    let Ok(mut value) = serde_json::from_slice::<Value>(body) else {
        return body.to_vec();
    };
    redact_value_in_place(&mut value, filter_keys, redact_value);
    serde_json::to_vec(&value).unwrap_or_else(|_| body.to_vec())
}

fn redact_value_in_place(value: &mut Value, filter_keys: &[String], redact_value: &str) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if filter_keys.iter().any(|k| k == key) {
                    *v = Value::String(redact_value.to_string());
                } else {
                    redact_value_in_place(v, filter_keys, redact_value);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                redact_value_in_place(item, filter_keys, redact_value);
            }
        }
        _ => {}
    }
}

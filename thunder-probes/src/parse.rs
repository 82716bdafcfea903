//! Enumeration tool report parsing
//!
//! Tools write a JSON report keyed by site name. A site record carries the
//! handle it matched when the tool knows it; otherwise a claimed site counts
//! as the target handle itself.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Record statuses meaning the account does not exist on that site
const ABSENT_STATUSES: &[&str] = &["available", "not found", "unknown", "illegal", "waf"];

/// Extract discovered handles from a tool's JSON report
pub fn parse_tool_output(json: &str, target: &str) -> Result<BTreeSet<String>, serde_json::Error> {
    let data: Value = serde_json::from_str(json)?;
    let mut found = BTreeSet::new();

    match &data {
        Value::Object(map) => match map.get("profiles") {
            Some(Value::Object(profiles)) => {
                for profile in profiles.values() {
                    found.insert(username_of(profile).unwrap_or(target).to_string());
                }
            }
            _ => {
                for record in map.values().filter_map(Value::as_object) {
                    if let Some(handle) = record_handle(record, target) {
                        found.insert(handle.to_string());
                    }
                }
            }
        },
        Value::Array(items) => {
            for item in items.iter().filter_map(Value::as_object) {
                if let Some(username) = item.get("username").and_then(Value::as_str) {
                    found.insert(username.to_string());
                } else if item.contains_key("site") {
                    found.insert(target.to_string());
                }
            }
        }
        _ => {}
    }

    found.retain(|handle| !handle.trim().is_empty());
    Ok(found)
}

fn username_of(value: &Value) -> Option<&str> {
    value.get("username").and_then(Value::as_str)
}

fn record_handle<'a>(record: &'a Map<String, Value>, target: &'a str) -> Option<&'a str> {
    if let Some(username) = record.get("username").and_then(Value::as_str) {
        return Some(username);
    }

    // Status is either a plain string or an object with a "status" field
    let status = match record.get("status") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(inner)) => inner.get("status").and_then(Value::as_str),
        _ => None,
    };

    match status {
        Some(s) if ABSENT_STATUSES.contains(&s.to_lowercase().as_str()) => None,
        _ => Some(target),
    }
}

use serde_json::{Map, Value};

use crate::parser::registry::FormatDescriptor;
use crate::parser::timestamp::TimestampLayout;
use crate::parser::traits::{LineCaptures, LineMatcher};

pub const JSON_LINES_NAME: &str = "JSON Lines";

/// Keys checked for the event time, in priority order.
const TIME_FIELDS: [&str; 4] = ["timestamp", "time", "ts", "@timestamp"];

/// One JSON object per line.
///
/// Top-level scalars become fields; nested objects and arrays are kept as
/// their compact JSON text.
pub struct JsonMatcher;

impl LineMatcher for JsonMatcher {
    fn captures(&self, line: &str) -> Option<LineCaptures> {
        let trimmed = line.trim();
        // cheap reject before handing the line to serde
        if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
            return None;
        }

        let obj: Map<String, Value> = serde_json::from_str(trimmed).ok()?;
        let timestamp_key = TIME_FIELDS
            .iter()
            .copied()
            .find(|key| obj.get(*key).and_then(scalar_text).is_some());

        let mut captures = LineCaptures {
            timestamp: timestamp_key.and_then(|key| obj.get(key)).and_then(scalar_text),
            fields: Vec::with_capacity(obj.len()),
        };

        for (key, value) in &obj {
            if Some(key.as_str()) == timestamp_key {
                continue;
            }
            let text = match value {
                Value::Null => continue,
                Value::Object(_) | Value::Array(_) => value.to_string(),
                other => scalar_text(other).unwrap_or_default(),
            };
            captures.fields.push((key.clone(), text));
        }

        Some(captures)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn json_lines() -> FormatDescriptor {
    FormatDescriptor::new(JSON_LINES_NAME, JsonMatcher, TimestampLayout::Rfc3339OrEpoch)
}

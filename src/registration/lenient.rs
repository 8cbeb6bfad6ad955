//! Tolerant decoders for values captured by HTML forms.
//!
//! Form fields arrive as whatever the page produced: booleans, `"yes"`,
//! `"false"`, numbers typed into text inputs, or empty strings. These
//! decoders never fail on an unexpected shape; they fall back to "unknown"
//! so a single odd field cannot reject a whole patch.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Interpret a yes/no answer.
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Interpret a non-negative count.
pub fn parse_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `Option<bool>` field: booleans, `"yes"`/`"no"`, `"true"`/`"false"`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_flag))
}

/// `Option<usize>` field: numbers or numeric strings.
pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_count))
}

/// Cursor field: like [`count`], defaulting to zero.
pub fn index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(count(deserializer)?.unwrap_or(0))
}

/// `String` field that may have been sent as a number.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}

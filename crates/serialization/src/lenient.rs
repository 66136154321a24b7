//! Lenient scalar decoding and compact number encoding.
//!
//! Older dashboard versions stored form input verbatim, so numbers show up
//! both as JSON numbers and as strings (`"10"`, `"0,5"`, `""`), and text
//! fields such as chat ids show up as numbers or `null`. On the way out,
//! whole numbers are written without a fractional part.

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Largest magnitude written as an integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Interpret a JSON value as a number. Empty or non-numeric strings are `None`.
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().replace(',', ".");
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
        _ => None,
    }
}

/// Interpret a JSON value as a non-negative integer, truncating fractions.
pub fn count_from_value(value: &Value) -> Option<u32> {
    number_from_value(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.min(u32::MAX as f64) as u32)
}

/// Interpret a JSON value as text. Numbers keep their JSON spelling;
/// `null`, booleans, arrays and objects are `None`.
pub fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

/// Like [`opt_string`], with anything unreadable as an empty string.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// For fields where an explicit `null` means "unbounded": always `Some`.
pub fn nullable_f64<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(Some(value.as_ref().and_then(number_from_value)))
}

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    })
}

/// `2.0` becomes `2`, `2.5` stays `2.5`.
pub fn number_to_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub fn ser_opt_f64<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&number_to_value(*v)),
        None => serializer.serialize_none(),
    }
}

pub fn ser_nullable_f64<S>(value: &Option<Option<f64>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(Some(v)) => serializer.serialize_some(&number_to_value(*v)),
        _ => serializer.serialize_none(),
    }
}

//! Coercion helpers for the free-form `params` maps attached to actioner
//! definitions and scenario entries. YAML loaders disagree on whether a
//! bare number is an integer or a float, so numeric reads accept both.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::ActionerError;

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

pub(crate) fn opt_str<'a>(
    params: &'a HashMap<String, JsonValue>,
    key: &str,
) -> Result<Option<&'a str>, ActionerError> {
    match params.get(key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(other) => Err(ActionerError::InvalidParam {
            name: key.to_owned(),
            expected: "a string",
            got: json_type_name(other),
        }),
    }
}

pub(crate) fn require_str<'a>(
    params: &'a HashMap<String, JsonValue>,
    key: &str,
) -> Result<&'a str, ActionerError> {
    opt_str(params, key)?.ok_or_else(|| ActionerError::MissingParam(key.to_owned()))
}

/// Integer read that tolerates floating-point encodings by truncating.
pub(crate) fn opt_int(
    params: &HashMap<String, JsonValue>,
    key: &str,
) -> Result<Option<i64>, ActionerError> {
    match params.get(key) {
        None => Ok(None),
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Some(f as i64))
            } else {
                Err(ActionerError::InvalidParam {
                    name: key.to_owned(),
                    expected: "a number",
                    got: "an out-of-range number",
                })
            }
        }
        Some(other) => Err(ActionerError::InvalidParam {
            name: key.to_owned(),
            expected: "a number",
            got: json_type_name(other),
        }),
    }
}

pub(crate) fn require_int(
    params: &HashMap<String, JsonValue>,
    key: &str,
) -> Result<i64, ActionerError> {
    opt_int(params, key)?.ok_or_else(|| ActionerError::MissingParam(key.to_owned()))
}

pub(crate) fn opt_bool(
    params: &HashMap<String, JsonValue>,
    key: &str,
) -> Result<Option<bool>, ActionerError> {
    match params.get(key) {
        None => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ActionerError::InvalidParam {
            name: key.to_owned(),
            expected: "a boolean",
            got: json_type_name(other),
        }),
    }
}

/// Human-friendly duration string, e.g. `"30m"`.
pub(crate) fn opt_duration(
    params: &HashMap<String, JsonValue>,
    key: &str,
) -> Result<Option<Duration>, ActionerError> {
    match opt_str(params, key)? {
        None => Ok(None),
        Some(s) => humantime::parse_duration(s)
            .map(Some)
            .map_err(|error| ActionerError::InvalidDuration {
                name: key.to_owned(),
                error,
            }),
    }
}

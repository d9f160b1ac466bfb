#![forbid(unsafe_code)]

use super::ai::ai_error;
use serde_json::{Map, Value};

pub(crate) type Args = Map<String, Value>;

pub(crate) fn args_object(args: Value) -> Result<Args, Value> {
    match args {
        Value::Object(obj) => Ok(obj),
        Value::Null => Ok(Map::new()),
        _ => Err(ai_error("INVALID_INPUT", "arguments must be an object")),
    }
}

pub(crate) fn require_string(args: &Args, key: &str) -> Result<String, Value> {
    match optional_string(args, key)? {
        Some(v) => Ok(v),
        None => Err(ai_error("INVALID_INPUT", &format!("{key} is required"))),
    }
}

pub(crate) fn optional_string(args: &Args, key: &str) -> Result<Option<String>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.to_string())),
        Some(_) => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a string"),
        )),
    }
}

pub(crate) fn optional_string_list(args: &Args, key: &str) -> Result<Vec<String>, Value> {
    let invalid = || ai_error("INVALID_INPUT", &format!("{key} must be an array of strings"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}

pub(crate) fn optional_usize(args: &Args, key: &str) -> Result<Option<usize>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be a non-negative integer"),
                )
            }),
        Some(_) => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a non-negative integer"),
        )),
    }
}

/// Reads a row id and wraps it in its typed id.
pub(crate) fn optional_id<T, E>(
    args: &Args,
    key: &str,
    make: fn(i64) -> Result<T, E>,
) -> Result<Option<T>, Value> {
    let invalid = || ai_error("INVALID_INPUT", &format!("{key} must be a positive integer id"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let raw = n.as_i64().ok_or_else(invalid)?;
            make(raw).map(Some).map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
    }
}

pub(crate) fn require_id<T, E>(
    args: &Args,
    key: &str,
    make: fn(i64) -> Result<T, E>,
) -> Result<T, Value> {
    optional_id(args, key, make)?
        .ok_or_else(|| ai_error("INVALID_INPUT", &format!("{key} is required")))
}

pub(crate) fn optional_id_list<T, E>(
    args: &Args,
    key: &str,
    make: fn(i64) -> Result<T, E>,
) -> Result<Vec<T>, Value> {
    let invalid = || ai_error("INVALID_INPUT", &format!("{key} must be an array of positive integer ids"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_i64()
                    .ok_or_else(invalid)
                    .and_then(|raw| make(raw).map_err(|_| invalid()))
            })
            .collect(),
        Some(_) => Err(invalid()),
    }
}

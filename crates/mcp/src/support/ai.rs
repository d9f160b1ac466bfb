#![forbid(unsafe_code)]

use rl_core::stats::StatsError;
use rl_storage::StoreError;
use serde_json::{Value, json};

pub(crate) fn format_store_error(err: &StoreError) -> String {
    match err {
        StoreError::Io(e) => format!("IO: {e}"),
        StoreError::Sql(e) => format!("SQL: {e}"),
        StoreError::InvalidInput(msg) => format!("Invalid input: {msg}"),
        StoreError::AlreadyExists(what) => format!("Already exists: {what}"),
        StoreError::UnknownId => "Unknown id".to_string(),
        StoreError::UnknownUser => "Unknown user".to_string(),
        StoreError::Integrity(detail) => format!("Integrity violation: {detail}"),
    }
}

/// Maps a store failure on a request path to its error envelope.
pub(crate) fn store_error_response(err: StoreError) -> Value {
    let message = format_store_error(&err);
    match err {
        StoreError::InvalidInput(_) => ai_error_with(
            "INVALID_INPUT",
            &message,
            Some("Fix input fields and retry."),
            Vec::new(),
        ),
        StoreError::AlreadyExists(_) => ai_error_with(
            "ALREADY_EXISTS",
            &message,
            Some("Use a different name or list existing entries."),
            Vec::new(),
        ),
        StoreError::UnknownId => ai_error_with(
            "UNKNOWN_ID",
            &message,
            Some("Check identifiers and retry."),
            Vec::new(),
        ),
        StoreError::UnknownUser => unauthorized(),
        StoreError::Integrity(_) => ai_error("INTEGRITY_ERROR", &message),
        StoreError::Io(_) | StoreError::Sql(_) => ai_error("STORE_ERROR", &message),
    }
}

pub(crate) fn stats_error_response(err: &StatsError) -> Value {
    ai_error_with(
        "INTEGRITY_ERROR",
        &format!("Statistics aborted: {err}"),
        Some("Repair the referenced stock record; no partial statistics are returned."),
        Vec::new(),
    )
}

pub(crate) fn unauthorized() -> Value {
    ai_error_with(
        "UNAUTHORIZED",
        "Caller could not be resolved to a known user",
        Some("Pass the user_id of an existing user."),
        Vec::new(),
    )
}

pub(crate) fn forbidden(action: &str) -> Value {
    ai_error(
        "FORBIDDEN",
        &format!("Caller role is not allowed to {action}"),
    )
}

pub(crate) fn ai_ok_with_warnings(
    intent: &str,
    result: Value,
    warnings: Vec<Value>,
    refs: Vec<Value>,
) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "warnings": warnings,
        "refs": refs,
        "error": null
    })
}

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    ai_ok_with_warnings(intent, result, Vec::new(), Vec::new())
}

pub(crate) fn warning(code: &str, message: &str, recovery: &str) -> Value {
    json!({
        "code": code,
        "message": message,
        "recovery": recovery
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    ai_error_with(code, message, None, Vec::new())
}

pub(crate) fn ai_error_with(
    code: &str,
    message: &str,
    recovery: Option<&str>,
    refs: Vec<Value>,
) -> Value {
    let mut error_obj = serde_json::Map::new();
    error_obj.insert("code".to_string(), Value::String(code.to_string()));
    error_obj.insert(
        "message".to_string(),
        Value::String(message.trim().to_string()),
    );
    if let Some(recovery) = recovery {
        error_obj.insert(
            "recovery".to_string(),
            Value::String(recovery.trim().to_string()),
        );
    }

    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "warnings": [],
        "refs": refs,
        "error": Value::Object(error_obj)
    })
}

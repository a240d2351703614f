use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Deserializes the whole `params` object into `T`.
pub fn params_as<T: DeserializeOwned>(req: &Request) -> Result<T, Value> {
    serde_json::from_value(req.params.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

pub fn required_time(req: &Request, key: &str) -> Result<DateTime<Utc>, Value> {
    match optional_time(req, key)? {
        Some(t) => Ok(t),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_time(req: &Request, key: &str) -> Result<Option<DateTime<Utc>>, Value> {
    let Some(raw) = req.params.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let Some(text) = raw.as_str() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an RFC 3339 string", key),
            None,
        ));
    };
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| {
            err(
                &req.id,
                "bad_params",
                format!("{} is not RFC 3339: {}", key, e),
                Some(json!({ "value": text })),
            )
        })
}

/// `params.now` if the host drives the clock, else the wall clock.
pub fn request_now(req: &Request) -> Result<DateTime<Utc>, Value> {
    Ok(optional_time(req, "now")?.unwrap_or_else(Utc::now))
}

pub fn optional_year(req: &Request, key: &str) -> Result<Option<u8>, Value> {
    let Some(raw) = req.params.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let year = raw
        .as_i64()
        .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be integer", key), None))?;
    crate::model::check_year(year)
        .map(Some)
        .map_err(|e| err(&req.id, e.code(), e.to_string(), None))
}

pub fn query_failed(req: &Request, e: anyhow::Error) -> Value {
    err(&req.id, "db_query_failed", format!("{e:#}"), None)
}

pub fn insert_failed(req: &Request, table: &str, e: anyhow::Error) -> Value {
    err(
        &req.id,
        "db_insert_failed",
        format!("{e:#}"),
        Some(json!({ "table": table })),
    )
}

pub fn update_failed(req: &Request, table: &str, e: anyhow::Error) -> Value {
    err(
        &req.id,
        "db_update_failed",
        format!("{e:#}"),
        Some(json!({ "table": table })),
    )
}

pub fn delete_failed(req: &Request, table: &str, e: anyhow::Error) -> Value {
    err(
        &req.id,
        "db_delete_failed",
        format!("{e:#}"),
        Some(json!({ "table": table })),
    )
}

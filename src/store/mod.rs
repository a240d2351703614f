//! Repository over the workspace SQLite connection.
//!
//! Each entity family is a trait implemented for `rusqlite::Connection`, so
//! handlers call `conn.list_assignments()` on whatever connection the
//! workspace holds and tests use an in-memory one.

mod assignments;
mod passes;
mod question_bank;
mod staff;
mod submissions;
mod timetable;

pub use assignments::AssignmentStore;
pub use passes::{PassStore, ReviewOutcome};
pub use question_bank::QuestionBankStore;
pub use staff::StaffStore;
pub use submissions::{SubmissionFilter, SubmissionStore};
pub use timetable::TimetableStore;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

/// RFC 3339 with millisecond precision, so text order is time order.
pub(crate) fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(col: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

pub(crate) fn parse_ts_opt(col: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(col, &s)).transpose()
}

pub(crate) fn from_json_col<T: serde::de::DeserializeOwned>(
    col: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e)))
}

pub(crate) fn to_json_col<T: serde::Serialize>(value: &T, what: &str) -> anyhow::Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize {what}"))
}

#[cfg(test)]
pub(crate) fn test_conn() -> rusqlite::Connection {
    let conn = rusqlite::Connection::open_in_memory().expect("open in-memory db");
    crate::db::init_schema(&conn).expect("init schema");
    conn
}

use super::{parse_ts, parse_ts_opt, ts};
use crate::model::{PassRequest, PassStatus};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Reviewed(PassRequest),
    NotFound,
    /// The request was already decided; carries its current state.
    AlreadyReviewed(PassRequest),
}

pub trait PassStore {
    fn insert_pass(&self, p: &PassRequest) -> anyhow::Result<()>;
    /// Newest first, optionally narrowed by status and student.
    fn list_passes(
        &self,
        status: Option<PassStatus>,
        student_id: Option<&str>,
    ) -> anyhow::Result<Vec<PassRequest>>;
    fn get_pass(&self, id: &str) -> anyhow::Result<Option<PassRequest>>;
    fn review_pass(
        &self,
        id: &str,
        decision: PassStatus,
        reviewer: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<ReviewOutcome>;
}

const COLUMNS: &str =
    "id, student_id, student_name, reason, requested_time, status, reviewed_by, reviewed_at";

fn row_to_pass(row: &Row<'_>) -> rusqlite::Result<PassRequest> {
    let requested: String = row.get(4)?;
    let status: String = row.get(5)?;
    let status = PassStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown pass status {status:?}").into(),
        )
    })?;
    Ok(PassRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        student_name: row.get(2)?,
        reason: row.get(3)?,
        requested_time: parse_ts(4, &requested)?,
        status,
        reviewed_by: row.get(6)?,
        reviewed_at: parse_ts_opt(7, row.get(7)?)?,
    })
}

impl PassStore for Connection {
    fn insert_pass(&self, p: &PassRequest) -> anyhow::Result<()> {
        self.execute(
            &format!("INSERT INTO pass_requests({COLUMNS}) VALUES(?, ?, ?, ?, ?, ?, ?, ?)"),
            rusqlite::params![
                p.id,
                p.student_id,
                p.student_name,
                p.reason,
                ts(&p.requested_time),
                p.status.as_str(),
                p.reviewed_by,
                p.reviewed_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    fn list_passes(
        &self,
        status: Option<PassStatus>,
        student_id: Option<&str>,
    ) -> anyhow::Result<Vec<PassRequest>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {COLUMNS} FROM pass_requests
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR student_id = ?2)
             ORDER BY requested_time DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map((status.map(PassStatus::as_str), student_id), row_to_pass)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_pass(&self, id: &str) -> anyhow::Result<Option<PassRequest>> {
        let p = self
            .query_row(
                &format!("SELECT {COLUMNS} FROM pass_requests WHERE id = ?"),
                [id],
                row_to_pass,
            )
            .optional()?;
        Ok(p)
    }

    fn review_pass(
        &self,
        id: &str,
        decision: PassStatus,
        reviewer: &str,
        at: DateTime<Utc>,
    ) -> anyhow::Result<ReviewOutcome> {
        let n = self.execute(
            "UPDATE pass_requests SET status = ?, reviewed_by = ?, reviewed_at = ?
             WHERE id = ? AND status = 'Pending'",
            (decision.as_str(), reviewer, ts(&at), id),
        )?;
        let current = self.get_pass(id)?;
        Ok(match (n, current) {
            (_, None) => ReviewOutcome::NotFound,
            (0, Some(p)) => ReviewOutcome::AlreadyReviewed(p),
            (_, Some(p)) => ReviewOutcome::Reviewed(p),
        })
    }
}

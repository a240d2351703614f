use super::{from_json_col, parse_ts, parse_ts_opt, to_json_col, ts};
use crate::model::Assignment;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

pub trait AssignmentStore {
    fn insert_assignment(&self, a: &Assignment) -> anyhow::Result<()>;
    /// Newest first.
    fn list_assignments(&self) -> anyhow::Result<Vec<Assignment>>;
    fn get_assignment(&self, id: &str) -> anyhow::Result<Option<Assignment>>;
    /// Also removes the assignment's submissions. Returns false if absent.
    fn delete_assignment(&self, id: &str) -> anyhow::Result<bool>;
    /// Writes the publish flag and schedule. The flag only ever moves from
    /// unpublished to published; returns false if nothing changed.
    fn save_publish_state(&self, a: &Assignment) -> anyhow::Result<bool>;
    fn set_schedule(&self, id: &str, when: DateTime<Utc>) -> anyhow::Result<bool>;
}

const COLUMNS: &str = "id, teacher_id, teacher_name, class_id, target_year, title, description,
     questions_json, due_date, total_points, is_published, scheduled_at, created_at";

fn row_to_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    let questions: String = row.get(7)?;
    let due: String = row.get(8)?;
    let created: String = row.get(12)?;
    Ok(Assignment {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        teacher_name: row.get(2)?,
        class_id: row.get(3)?,
        target_year: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        questions: from_json_col(7, &questions)?,
        due_date: parse_ts(8, &due)?,
        total_points: row.get(9)?,
        is_published: row.get::<_, i64>(10)? != 0,
        scheduled_at: parse_ts_opt(11, row.get(11)?)?,
        created_at: parse_ts(12, &created)?,
    })
}

impl AssignmentStore for Connection {
    fn insert_assignment(&self, a: &Assignment) -> anyhow::Result<()> {
        self.execute(
            &format!("INSERT INTO assignments({COLUMNS}) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            rusqlite::params![
                a.id,
                a.teacher_id,
                a.teacher_name,
                a.class_id,
                a.target_year,
                a.title,
                a.description,
                to_json_col(&a.questions, "questions")?,
                ts(&a.due_date),
                a.total_points,
                a.is_published as i64,
                a.scheduled_at.as_ref().map(ts),
                ts(&a.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_assignments(&self) -> anyhow::Result<Vec<Assignment>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {COLUMNS} FROM assignments ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
            .query_map([], row_to_assignment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_assignment(&self, id: &str) -> anyhow::Result<Option<Assignment>> {
        let a = self
            .query_row(
                &format!("SELECT {COLUMNS} FROM assignments WHERE id = ?"),
                [id],
                row_to_assignment,
            )
            .optional()?;
        Ok(a)
    }

    fn delete_assignment(&self, id: &str) -> anyhow::Result<bool> {
        // Explicit so older workspaces without the cascade behave the same.
        self.execute("DELETE FROM submissions WHERE assignment_id = ?", [id])?;
        let n = self.execute("DELETE FROM assignments WHERE id = ?", [id])?;
        Ok(n > 0)
    }

    fn save_publish_state(&self, a: &Assignment) -> anyhow::Result<bool> {
        let n = self.execute(
            "UPDATE assignments SET is_published = 1, scheduled_at = ?
             WHERE id = ? AND is_published = 0",
            (a.scheduled_at.as_ref().map(ts), &a.id),
        )?;
        Ok(n > 0)
    }

    fn set_schedule(&self, id: &str, when: DateTime<Utc>) -> anyhow::Result<bool> {
        let n = self.execute(
            "UPDATE assignments SET scheduled_at = ? WHERE id = ? AND is_published = 0",
            (ts(&when), id),
        )?;
        Ok(n > 0)
    }
}

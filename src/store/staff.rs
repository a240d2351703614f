use super::{parse_ts, ts};
use crate::model::Teacher;
use rusqlite::Connection;

pub trait StaffStore {
    fn insert_teacher(&self, t: &Teacher) -> anyhow::Result<()>;
    /// Alphabetical by name.
    fn list_teachers(&self) -> anyhow::Result<Vec<Teacher>>;
    fn delete_teacher(&self, id: &str) -> anyhow::Result<bool>;
    fn teacher_email_exists(&self, email: &str) -> anyhow::Result<bool>;
}

impl StaffStore for Connection {
    fn insert_teacher(&self, t: &Teacher) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO teachers(id, name, email, phone, assigned_year, assigned_subject, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                t.id,
                t.name,
                t.email,
                t.phone,
                t.assigned_year,
                t.assigned_subject,
                ts(&t.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_teachers(&self) -> anyhow::Result<Vec<Teacher>> {
        let mut stmt = self.prepare(
            "SELECT id, name, email, phone, assigned_year, assigned_subject, created_at
             FROM teachers ORDER BY name COLLATE NOCASE, id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let created: String = row.get(6)?;
                Ok(Teacher {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    assigned_year: row.get(4)?,
                    assigned_subject: row.get(5)?,
                    created_at: parse_ts(6, &created)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete_teacher(&self, id: &str) -> anyhow::Result<bool> {
        let n = self.execute("DELETE FROM teachers WHERE id = ?", [id])?;
        Ok(n > 0)
    }

    fn teacher_email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let n: i64 = self.query_row(
            "SELECT COUNT(*) FROM teachers WHERE lower(email) = lower(?)",
            [email.trim()],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }
}

use super::from_json_col;
use crate::model::{DayOfWeek, PeriodTiming, SubjectMaster, TimetableEntry};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

pub trait TimetableStore {
    /// Ordered by period number.
    fn list_periods(&self) -> anyhow::Result<Vec<PeriodTiming>>;
    /// Replaces the whole day in one transaction.
    fn replace_periods(&self, periods: &[PeriodTiming]) -> anyhow::Result<()>;
    fn get_period(&self, number: u32) -> anyhow::Result<Option<PeriodTiming>>;

    fn list_timetable(
        &self,
        class_id: Option<&str>,
        year: Option<u8>,
    ) -> anyhow::Result<Vec<TimetableEntry>>;
    fn slot_taken(&self, class_id: &str, day: DayOfWeek, period: u32) -> anyhow::Result<bool>;
    fn insert_timetable_entry(&self, e: &TimetableEntry) -> anyhow::Result<()>;
    fn delete_timetable_entry(&self, id: &str) -> anyhow::Result<bool>;

    fn list_subjects(&self) -> anyhow::Result<Vec<SubjectMaster>>;
    fn set_subjects(&self, year: u8, subjects: &[String]) -> anyhow::Result<()>;
}

fn row_to_period(row: &Row<'_>) -> rusqlite::Result<PeriodTiming> {
    Ok(PeriodTiming {
        id: row.get(0)?,
        period_number: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        is_break: row.get::<_, i64>(4)? != 0,
        label: row.get(5)?,
    })
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<TimetableEntry> {
    let day: String = row.get(3)?;
    let day_of_week = DayOfWeek::parse(&day).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown day {day:?}").into(),
        )
    })?;
    Ok(TimetableEntry {
        id: row.get(0)?,
        class_id: row.get(1)?,
        year: row.get(2)?,
        day_of_week,
        period_number: row.get(4)?,
        subject: row.get(5)?,
        teacher_id: row.get(6)?,
        teacher_name: row.get(7)?,
    })
}

/// Monday..Saturday, then period.
const DAY_ORDER: &str = "CASE day_of_week
    WHEN 'Monday' THEN 1 WHEN 'Tuesday' THEN 2 WHEN 'Wednesday' THEN 3
    WHEN 'Thursday' THEN 4 WHEN 'Friday' THEN 5 ELSE 6 END";

impl TimetableStore for Connection {
    fn list_periods(&self) -> anyhow::Result<Vec<PeriodTiming>> {
        let mut stmt = self.prepare(
            "SELECT id, period_number, start_time, end_time, is_break, label
             FROM period_timings ORDER BY period_number",
        )?;
        let rows = stmt
            .query_map([], row_to_period)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn replace_periods(&self, periods: &[PeriodTiming]) -> anyhow::Result<()> {
        let tx = self.unchecked_transaction()?;
        tx.execute("DELETE FROM period_timings", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO period_timings(id, period_number, start_time, end_time, is_break, label)
                 VALUES(?, ?, ?, ?, ?, ?)",
            )?;
            for p in periods {
                stmt.execute((
                    &p.id,
                    p.period_number,
                    p.start_time.trim(),
                    p.end_time.trim(),
                    p.is_break as i64,
                    &p.label,
                ))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_period(&self, number: u32) -> anyhow::Result<Option<PeriodTiming>> {
        let p = self
            .query_row(
                "SELECT id, period_number, start_time, end_time, is_break, label
                 FROM period_timings WHERE period_number = ?",
                [number],
                row_to_period,
            )
            .optional()?;
        Ok(p)
    }

    fn list_timetable(
        &self,
        class_id: Option<&str>,
        year: Option<u8>,
    ) -> anyhow::Result<Vec<TimetableEntry>> {
        let mut stmt = self.prepare(&format!(
            "SELECT id, class_id, year, day_of_week, period_number, subject, teacher_id, teacher_name
             FROM timetable_entries
             WHERE (?1 IS NULL OR class_id = ?1)
               AND (?2 IS NULL OR year = ?2)
             ORDER BY {DAY_ORDER}, period_number, class_id"
        ))?;
        let rows = stmt
            .query_map((class_id, year), row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn slot_taken(&self, class_id: &str, day: DayOfWeek, period: u32) -> anyhow::Result<bool> {
        let n: i64 = self.query_row(
            "SELECT COUNT(*) FROM timetable_entries
             WHERE class_id = ? AND day_of_week = ? AND period_number = ?",
            (class_id, day.as_str(), period),
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    fn insert_timetable_entry(&self, e: &TimetableEntry) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO timetable_entries(
                id, class_id, year, day_of_week, period_number, subject, teacher_id, teacher_name
             ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                e.id,
                e.class_id,
                e.year,
                e.day_of_week.as_str(),
                e.period_number,
                e.subject,
                e.teacher_id,
                e.teacher_name,
            ],
        )?;
        Ok(())
    }

    fn delete_timetable_entry(&self, id: &str) -> anyhow::Result<bool> {
        let n = self.execute("DELETE FROM timetable_entries WHERE id = ?", [id])?;
        Ok(n > 0)
    }

    fn list_subjects(&self) -> anyhow::Result<Vec<SubjectMaster>> {
        let mut stmt =
            self.prepare("SELECT year, subjects_json FROM subject_masters ORDER BY year")?;
        let rows = stmt
            .query_map([], |row| {
                let raw: String = row.get(1)?;
                Ok(SubjectMaster {
                    year: row.get(0)?,
                    subjects: from_json_col(1, &raw)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn set_subjects(&self, year: u8, subjects: &[String]) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO subject_masters(year, subjects_json) VALUES(?, ?)
             ON CONFLICT(year) DO UPDATE SET subjects_json = excluded.subjects_json",
            (year, serde_json::to_string(subjects)?),
        )?;
        Ok(())
    }
}

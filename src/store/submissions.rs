use super::{from_json_col, parse_ts, to_json_col, ts};
use crate::model::Submission;
use rusqlite::{Connection, OptionalExtension, Row};

#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub assignment_id: Option<String>,
    pub student_id: Option<String>,
}

pub trait SubmissionStore {
    fn insert_submission(&self, s: &Submission) -> anyhow::Result<()>;
    fn find_submission(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<Submission>>;
    /// Most recent first.
    fn list_submissions(&self, filter: &SubmissionFilter) -> anyhow::Result<Vec<Submission>>;
}

const COLUMNS: &str = "id, assignment_id, student_id, student_name, answers_json, score,
     max_score, percentage, feedback_json, corrected_time";

fn row_to_submission(row: &Row<'_>) -> rusqlite::Result<Submission> {
    let answers: String = row.get(4)?;
    let feedback: String = row.get(8)?;
    let corrected: String = row.get(9)?;
    Ok(Submission {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        student_id: row.get(2)?,
        student_name: row.get(3)?,
        student_answers: from_json_col(4, &answers)?,
        score: row.get(5)?,
        max_score: row.get(6)?,
        percentage: row.get(7)?,
        feedback: from_json_col(8, &feedback)?,
        corrected_time: parse_ts(9, &corrected)?,
    })
}

impl SubmissionStore for Connection {
    fn insert_submission(&self, s: &Submission) -> anyhow::Result<()> {
        self.execute(
            &format!("INSERT INTO submissions({COLUMNS}) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            rusqlite::params![
                s.id,
                s.assignment_id,
                s.student_id,
                s.student_name,
                to_json_col(&s.student_answers, "answers")?,
                s.score,
                s.max_score,
                s.percentage,
                to_json_col(&s.feedback, "feedback")?,
                ts(&s.corrected_time),
            ],
        )?;
        Ok(())
    }

    fn find_submission(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<Submission>> {
        let s = self
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM submissions WHERE assignment_id = ? AND student_id = ?"
                ),
                [assignment_id, student_id],
                row_to_submission,
            )
            .optional()?;
        Ok(s)
    }

    fn list_submissions(&self, filter: &SubmissionFilter) -> anyhow::Result<Vec<Submission>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {COLUMNS} FROM submissions
             WHERE (?1 IS NULL OR assignment_id = ?1)
               AND (?2 IS NULL OR student_id = ?2)
             ORDER BY rowid DESC"
        ))?;
        let rows = stmt
            .query_map(
                (filter.assignment_id.as_deref(), filter.student_id.as_deref()),
                row_to_submission,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

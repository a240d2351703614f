use super::{from_json_col, parse_ts, to_json_col, ts};
use crate::model::{Difficulty, QuestionBankItem, QuestionSource};
use rusqlite::types::Type;
use rusqlite::Connection;

pub trait QuestionBankStore {
    fn add_bank_items(&self, items: &[QuestionBankItem]) -> anyhow::Result<usize>;
    /// Newest first. Subject and topic match case-insensitively.
    fn list_bank_items(
        &self,
        subject: Option<&str>,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<Vec<QuestionBankItem>>;
}

fn source_str(s: QuestionSource) -> &'static str {
    match s {
        QuestionSource::Ai => "ai",
        QuestionSource::Manual => "manual",
    }
}

fn conversion_err(col: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, msg.into())
}

impl QuestionBankStore for Connection {
    fn add_bank_items(&self, items: &[QuestionBankItem]) -> anyhow::Result<usize> {
        let tx = self.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO question_bank(
                    id, subject, topic, question_json, difficulty, source, created_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?)",
            )?;
            for item in items {
                stmt.execute((
                    &item.question.id,
                    item.subject.trim(),
                    item.topic.trim(),
                    to_json_col(&item.question, "question")?,
                    item.difficulty.as_str(),
                    source_str(item.source),
                    ts(&item.created_at),
                ))?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    fn list_bank_items(
        &self,
        subject: Option<&str>,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> anyhow::Result<Vec<QuestionBankItem>> {
        let mut stmt = self.prepare(
            "SELECT subject, topic, question_json, difficulty, source, created_at
             FROM question_bank
             WHERE (?1 IS NULL OR lower(subject) = lower(?1))
               AND (?2 IS NULL OR lower(topic) = lower(?2))
               AND (?3 IS NULL OR difficulty = ?3)
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map((subject, topic, difficulty.map(Difficulty::as_str)), |row| {
                let question: String = row.get(2)?;
                let difficulty: String = row.get(3)?;
                let source: String = row.get(4)?;
                let created: String = row.get(5)?;
                Ok(QuestionBankItem {
                    subject: row.get(0)?,
                    topic: row.get(1)?,
                    question: from_json_col(2, &question)?,
                    difficulty: difficulty
                        .parse::<Difficulty>()
                        .map_err(|e| conversion_err(3, e.to_string()))?,
                    source: source
                        .parse::<QuestionSource>()
                        .map_err(|e| conversion_err(4, e.to_string()))?,
                    created_at: parse_ts(5, &created)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

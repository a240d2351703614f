use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, insert_failed, optional_str, query_failed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Difficulty, Question, QuestionBankItem, QuestionKind, QuestionSource};
use crate::store::QuestionBankStore;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankQuestionInput {
    #[serde(default)]
    id: String,
    #[serde(flatten)]
    kind: QuestionKind,
    #[serde(alias = "question")]
    text: String,
    correct_answer: String,
    #[serde(default)]
    points: Option<u32>,
    difficulty: Difficulty,
}

fn parse_source(req: &Request) -> Result<QuestionSource, serde_json::Value> {
    match optional_str(req, "source") {
        None => Ok(QuestionSource::Manual),
        Some(s) => s.parse().map_err(|_| {
            err(
                &req.id,
                "bad_params",
                "source must be one of: ai, manual",
                None,
            )
        }),
    }
}

fn handle_question_bank_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let topic = match required_str(req, "topic") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let source = match parse_source(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("questions").filter(|v| v.is_array()) else {
        return err(&req.id, "bad_params", "questions must be an array", None);
    };
    let inputs: Vec<BankQuestionInput> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if inputs.is_empty() {
        return err(&req.id, "validation_failed", "questions must not be empty", None);
    }

    let now = Utc::now();
    let mut items = Vec::with_capacity(inputs.len());
    for q in inputs {
        if q.text.trim().is_empty() || q.correct_answer.trim().is_empty() {
            return err(
                &req.id,
                "validation_failed",
                "every question needs text and a correct answer",
                None,
            );
        }
        let id = if q.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            q.id.trim().to_string()
        };
        items.push(QuestionBankItem {
            subject: subject.clone(),
            topic: topic.clone(),
            question: Question {
                id,
                kind: q.kind,
                text: q.text,
                correct_answer: q.correct_answer,
                points: q
                    .points
                    .filter(|p| *p > 0)
                    .unwrap_or_else(|| q.difficulty.default_points()),
            },
            difficulty: q.difficulty,
            source,
            created_at: now,
        });
    }
    match conn.add_bank_items(&items) {
        Ok(n) => ok(&req.id, json!({ "added": n, "items": items })),
        Err(e) => insert_failed(req, "question_bank", e),
    }
}

fn handle_question_bank_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let difficulty = match optional_str(req, "difficulty") {
        Some(d) => match d.parse::<Difficulty>() {
            Ok(d) => Some(d),
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "difficulty must be one of: easy, medium, hard",
                    None,
                )
            }
        },
        None => None,
    };
    let subject = optional_str(req, "subject");
    let topic = optional_str(req, "topic");
    match conn.list_bank_items(subject.as_deref(), topic.as_deref(), difficulty) {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => query_failed(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "questionBank.add" => Some(handle_question_bank_add(state, req)),
        "questionBank.list" => Some(handle_question_bank_list(state, req)),
        _ => None,
    }
}

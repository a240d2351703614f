use crate::generation::{
    self, ChatContext, GeneratedQuestion, GenerationError, PlanRequest, QuestionRequest,
    TextGenerator,
};
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::assistant_defaults;
use crate::ipc::helpers::{optional_str, params_as, query_failed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Difficulty, PassStatus, QuestionBankItem, QuestionSource};
use crate::performance::{year_summaries, YearResolver};
use crate::store::{AssignmentStore, PassStore, QuestionBankStore, SubmissionFilter, SubmissionStore};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

const ALL_TYPES: [&str; 3] = ["multiple-choice", "fill-blank", "short-answer"];

fn generation_err(req: &Request, e: GenerationError) -> serde_json::Value {
    let details = match &e {
        GenerationError::Status { status, .. } => Some(json!({ "status": status })),
        _ => None,
    };
    err(&req.id, e.code(), e.to_string(), details)
}

fn generator<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a dyn TextGenerator, serde_json::Value> {
    state
        .generator
        .as_deref()
        .ok_or_else(|| generation_err(req, GenerationError::NotConfigured))
}

fn question_request(
    req: &Request,
    conn: Option<&Connection>,
) -> Result<QuestionRequest, serde_json::Value> {
    let (default_difficulty, default_count) =
        assistant_defaults(conn).map_err(|e| query_failed(req, e))?;
    let topic = required_str(req, "topic")?;
    let subject = required_str(req, "subject")?;
    let difficulty = match optional_str(req, "difficulty") {
        Some(d) => d.parse::<Difficulty>().map_err(|_| {
            err(
                &req.id,
                "bad_params",
                "difficulty must be one of: easy, medium, hard",
                None,
            )
        })?,
        None => default_difficulty,
    };
    let question_count = match req.params.get("questionCount") {
        Some(v) if !v.is_null() => v
            .as_u64()
            .map(|n| n.min(u64::from(u32::MAX)) as u32)
            .ok_or_else(|| err(&req.id, "bad_params", "questionCount must be integer", None))?,
        _ => default_count,
    };
    let question_types = match req.params.get("questionTypes").and_then(|v| v.as_array()) {
        Some(arr) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .collect(),
        None => ALL_TYPES.iter().map(|s| s.to_string()).collect(),
    };
    Ok(QuestionRequest {
        topic,
        subject,
        difficulty,
        question_count,
        question_types,
    })
}

fn handle_generate_questions(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gen = match generator(state, req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    let request = match question_request(req, state.db.as_ref()) {
        Ok(r) => r,
        Err(e) => return e,
    };
    let questions = match generation::generate_questions(gen, &request, Utc::now()) {
        Ok(q) => q,
        Err(e) => return generation_err(req, e),
    };

    let save = req
        .params
        .get("saveToBank")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let mut saved = 0;
    if save {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        match conn.add_bank_items(&bank_items(&request, &questions)) {
            Ok(n) => saved = n,
            Err(e) => return err(&req.id, "db_insert_failed", format!("{e:#}"), None),
        }
    }
    ok(
        &req.id,
        json!({ "questions": questions, "savedToBank": saved }),
    )
}

fn bank_items(request: &QuestionRequest, questions: &[GeneratedQuestion]) -> Vec<QuestionBankItem> {
    let now = Utc::now();
    questions
        .iter()
        .map(|g| QuestionBankItem {
            subject: request.subject.clone(),
            topic: request.topic.clone(),
            question: g.question.clone(),
            difficulty: g.difficulty,
            source: QuestionSource::Ai,
            created_at: now,
        })
        .collect()
}

fn handle_semester_plan(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gen = match generator(state, req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    let request: PlanRequest = match params_as(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match generation::generate_semester_plan(gen, &request) {
        Ok(plan) => ok(&req.id, json!({ "plan": plan })),
        Err(e) => generation_err(req, e),
    }
}

fn workspace_context(conn: &Connection) -> anyhow::Result<ChatContext> {
    let assignments = conn.list_assignments()?;
    let submissions = conn.list_submissions(&SubmissionFilter::default())?;
    let years = YearResolver::from_assignments(&assignments);
    Ok(ChatContext {
        pending_requests: conn.list_passes(Some(PassStatus::Pending), None)?,
        performance_by_year: year_summaries(&submissions, &years),
        total_assignments: assignments.len(),
        total_submissions: submissions.len(),
    })
}

fn handle_chat(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gen = match generator(state, req) {
        Ok(g) => g,
        Err(e) => return e,
    };
    let message = match required_str(req, "message") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let context = match optional_str(req, "context") {
        Some(c) => c,
        None => match state.db.as_ref() {
            Some(conn) => match workspace_context(conn) {
                Ok(ctx) => ctx.render(),
                Err(e) => return query_failed(req, e),
            },
            None => ChatContext::default().render(),
        },
    };
    match generation::chat(gen, &message, &context) {
        Ok(response) => ok(&req.id, json!({ "response": response })),
        Err(e) => generation_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assistant.generateQuestions" => Some(handle_generate_questions(state, req)),
        "assistant.semesterPlan" => Some(handle_semester_plan(state, req)),
        "assistant.chat" => Some(handle_chat(state, req)),
        _ => None,
    }
}

use crate::grading;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, insert_failed, optional_str, query_failed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Submission;
use crate::store::{AssignmentStore, SubmissionFilter, SubmissionStore};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Accepts `{questionId: answer}` objects; non-string answers are stringified
/// so `42` and `"42"` grade the same.
fn parse_answers(req: &Request) -> Result<BTreeMap<String, String>, serde_json::Value> {
    let Some(obj) = req.params.get("answers").and_then(|v| v.as_object()) else {
        return Err(err(&req.id, "bad_params", "answers must be an object", None));
    };
    Ok(obj
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v.as_str() {
                Some(s) => s.to_string(),
                None => v.to_string(),
            };
            (k.clone(), text)
        })
        .collect())
}

fn handle_submissions_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = optional_str(req, "studentName").unwrap_or_else(|| student_id.clone());
    let answers = match parse_answers(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let assignment = match conn.get_assignment(&assignment_id) {
        Ok(Some(a)) => a,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "assignment not found",
                Some(json!({ "assignmentId": assignment_id })),
            )
        }
        Err(e) => return query_failed(req, e),
    };
    match conn.find_submission(&assignment_id, &student_id) {
        Ok(None) => {}
        Ok(Some(existing)) => {
            return err(
                &req.id,
                "already_submitted",
                "this student has already submitted this assignment",
                Some(json!({ "submissionId": existing.id })),
            )
        }
        Err(e) => return query_failed(req, e),
    }

    let outcome = match grading::grade(&answers, &assignment.questions) {
        Ok(o) => o,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        assignment_id,
        student_id,
        student_name,
        student_answers: answers,
        score: outcome.score,
        max_score: outcome.max_score,
        percentage: outcome.percentage,
        feedback: outcome.feedback,
        corrected_time: Utc::now(),
    };
    if let Err(e) = conn.insert_submission(&submission) {
        return insert_failed(req, "submissions", e);
    }
    info!(
        submission_id = %submission.id,
        assignment_id = %submission.assignment_id,
        percentage = submission.percentage,
        "submission graded"
    );
    ok(&req.id, json!({ "submission": submission }))
}

fn handle_submissions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "submissions": [] }));
    };
    let filter = SubmissionFilter {
        assignment_id: optional_str(req, "assignmentId"),
        student_id: optional_str(req, "studentId"),
    };
    match conn.list_submissions(&filter) {
        Ok(rows) => ok(&req.id, json!({ "submissions": rows })),
        Err(e) => query_failed(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.submit" => Some(handle_submissions_submit(state, req)),
        "submissions.list" => Some(handle_submissions_list(state, req)),
        _ => None,
    }
}

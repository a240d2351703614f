use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, insert_failed, optional_str, request_now, required_str, update_failed,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{PassRequest, PassStatus};
use crate::store::{PassStore, ReviewOutcome};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

const MAX_REASON_LEN: usize = 500;

fn handle_passes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_name = match required_str(req, "studentName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reason = match required_str(req, "reason") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if reason.chars().count() > MAX_REASON_LEN {
        return err(
            &req.id,
            "validation_failed",
            format!("reason length must be <= {}", MAX_REASON_LEN),
            None,
        );
    }
    let now = match request_now(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let pass = PassRequest {
        id: Uuid::new_v4().to_string(),
        student_id,
        student_name,
        reason,
        requested_time: now,
        status: PassStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
    };
    if let Err(e) = conn.insert_pass(&pass) {
        return insert_failed(req, "pass_requests", e);
    }
    ok(&req.id, json!({ "request": pass }))
}

fn handle_passes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "requests": [] }));
    };
    let status = match optional_str(req, "status") {
        Some(s) => match PassStatus::parse(&s) {
            Some(st) => Some(st),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "status must be one of: Pending, Approved, Denied",
                    None,
                )
            }
        },
        None => None,
    };
    let student_id = optional_str(req, "studentId");
    match conn.list_passes(status, student_id.as_deref()) {
        Ok(rows) => ok(&req.id, json!({ "requests": rows })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_passes_review(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "requestId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reviewer = match required_str(req, "reviewedBy") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let decision = match required_str(req, "decision") {
        Ok(v) => match PassStatus::parse(&v) {
            Some(PassStatus::Pending) | None => {
                return err(
                    &req.id,
                    "bad_params",
                    "decision must be one of: Approved, Denied",
                    None,
                )
            }
            Some(d) => d,
        },
        Err(e) => return e,
    };
    let now = match request_now(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.review_pass(&id, decision, &reviewer, now) {
        Ok(ReviewOutcome::Reviewed(p)) => {
            info!(request_id = %p.id, status = p.status.as_str(), "pass request reviewed");
            ok(&req.id, json!({ "request": p }))
        }
        Ok(ReviewOutcome::AlreadyReviewed(p)) => err(
            &req.id,
            "already_reviewed",
            "pass request has already been reviewed",
            Some(json!({ "status": p.status, "reviewedBy": p.reviewed_by })),
        ),
        Ok(ReviewOutcome::NotFound) => err(&req.id, "not_found", "pass request not found", None),
        Err(e) => update_failed(req, "pass_requests", e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "passes.create" => Some(handle_passes_create(state, req)),
        "passes.list" => Some(handle_passes_list(state, req)),
        "passes.review" => Some(handle_passes_review(state, req)),
        _ => None,
    }
}

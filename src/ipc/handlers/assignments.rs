use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, delete_failed, insert_failed, optional_str, optional_time, optional_year,
    params_as, query_failed, request_now, required_str, required_time, update_failed,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, NewAssignment};
use crate::performance::year_from_class_id;
use crate::publisher::{self, PublishError, PublishState};
use crate::store::{AssignmentStore, SubmissionFilter, SubmissionStore};
use serde_json::json;
use tracing::info;

fn publish_err(req: &Request, e: PublishError) -> serde_json::Value {
    err(&req.id, e.code(), e.to_string(), None)
}

fn assignment_json(a: &Assignment) -> serde_json::Value {
    let mut v = json!(a);
    v["state"] = json!(PublishState::of(a));
    v
}

fn summary_json(a: &Assignment) -> serde_json::Value {
    json!({
        "id": a.id,
        "title": a.title,
        "teacherId": a.teacher_id,
        "teacherName": a.teacher_name,
        "classId": a.class_id,
        "targetYear": a.target_year,
        "dueDate": a.due_date,
        "totalPoints": a.total_points,
        "questionCount": a.questions.len(),
        "isPublished": a.is_published,
        "scheduledAt": a.scheduled_at,
        "createdAt": a.created_at,
        "state": PublishState::of(a),
    })
}

fn load_assignment(
    conn: &rusqlite::Connection,
    req: &Request,
    id: &str,
) -> Result<Assignment, serde_json::Value> {
    match conn.get_assignment(id) {
        Ok(Some(a)) => Ok(a),
        Ok(None) => Err(err(
            &req.id,
            "not_found",
            "assignment not found",
            Some(json!({ "assignmentId": id })),
        )),
        Err(e) => Err(query_failed(req, e)),
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft: NewAssignment = match params_as(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let schedule = match optional_time(req, "scheduledAt") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = match request_now(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = draft.validate() {
        return err(&req.id, e.code(), e.to_string(), None);
    }

    let assignment = match publisher::create(draft.build(now), schedule, now) {
        Ok(a) => a,
        Err(e) => return publish_err(req, e),
    };
    if let Err(e) = conn.insert_assignment(&assignment) {
        return insert_failed(req, "assignments", e);
    }
    info!(
        assignment_id = %assignment.id,
        state = ?PublishState::of(&assignment),
        "assignment created"
    );
    ok(&req.id, json!({ "assignment": assignment_json(&assignment) }))
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "assignments": [] }));
    };
    let class_id = optional_str(req, "classId");
    let teacher_id = optional_str(req, "teacherId");
    let year = match optional_year(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let wanted_state = match optional_str(req, "state") {
        Some(s) => match s.parse::<PublishState>() {
            Ok(st) => Some(st),
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "state must be one of: draft, scheduled, published",
                    None,
                )
            }
        },
        None => None,
    };

    let all = match conn.list_assignments() {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let rows: Vec<serde_json::Value> = all
        .iter()
        .filter(|a| class_id.as_deref().map_or(true, |c| a.class_id == c))
        .filter(|a| teacher_id.as_deref().map_or(true, |t| a.teacher_id == t))
        .filter(|a| {
            year.map_or(true, |y| {
                a.target_year
                    .unwrap_or_else(|| year_from_class_id(&a.class_id))
                    == y
            })
        })
        .filter(|a| wanted_state.map_or(true, |s| PublishState::of(a) == s))
        .map(summary_json)
        .collect();
    ok(&req.id, json!({ "assignments": rows }))
}

fn handle_assignments_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let a = match load_assignment(conn, req, &id) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let submissions = match conn.list_submissions(&SubmissionFilter {
        assignment_id: Some(id),
        student_id: None,
    }) {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    ok(
        &req.id,
        json!({
            "assignment": assignment_json(&a),
            "submissionCount": submissions.len()
        }),
    )
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.delete_assignment(&id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "assignment not found", None),
        Err(e) => delete_failed(req, "assignments", e),
    }
}

fn handle_assignments_reschedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let when = match required_time(req, "scheduledAt") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = match request_now(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut a = match load_assignment(conn, req, &id) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if let Err(e) = publisher::reschedule(&mut a, when, now) {
        return publish_err(req, e);
    }
    match conn.set_schedule(&a.id, when) {
        Ok(true) => ok(&req.id, json!({ "assignment": assignment_json(&a) })),
        Ok(false) => publish_err(req, PublishError::NotScheduled(a.id.clone())),
        Err(e) => update_failed(req, "assignments", e),
    }
}

fn handle_assignments_publish_now(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut a = match load_assignment(conn, req, &id) {
        Ok(a) => a,
        Err(e) => return e,
    };
    if let Err(e) = publisher::publish_now(&mut a) {
        return publish_err(req, e);
    }
    match conn.save_publish_state(&a) {
        Ok(true) => {
            info!(assignment_id = %a.id, "assignment published manually");
            ok(&req.id, json!({ "assignment": assignment_json(&a) }))
        }
        Ok(false) => publish_err(req, PublishError::AlreadyPublished(a.id.clone())),
        Err(e) => update_failed(req, "assignments", e),
    }
}

fn handle_assignments_tick(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let now = match request_now(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut all = match conn.list_assignments() {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let flipped = publisher::tick(now, &mut all);

    let mut published = Vec::with_capacity(flipped.len());
    for a in all.iter().filter(|a| flipped.contains(&a.id)) {
        match conn.save_publish_state(a) {
            Ok(true) => published.push(a.id.clone()),
            Ok(false) => {}
            Err(e) => return update_failed(req, "assignments", e),
        }
    }
    ok(&req.id, json!({ "published": published, "now": now }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.open" => Some(handle_assignments_open(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        "assignments.reschedule" => Some(handle_assignments_reschedule(state, req)),
        "assignments.publishNow" => Some(handle_assignments_publish_now(state, req)),
        "assignments.tick" => Some(handle_assignments_tick(state, req)),
        _ => None,
    }
}

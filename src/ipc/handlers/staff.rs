use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, delete_failed, insert_failed, optional_str, optional_year, query_failed,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::model::Teacher;
use crate::store::StaffStore;
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn plausible_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match conn.list_teachers() {
        Ok(rows) => ok(&req.id, json!({ "teachers": rows })),
        Err(e) => query_failed(req, e),
    }
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match required_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !plausible_email(&email) {
        return err(&req.id, "validation_failed", "email is not valid", None);
    }
    let assigned_year = match optional_year(req, "assignedYear") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.teacher_email_exists(&email) {
        Ok(false) => {}
        Ok(true) => {
            return err(
                &req.id,
                "validation_failed",
                "a teacher with this email already exists",
                Some(json!({ "email": email })),
            )
        }
        Err(e) => return query_failed(req, e),
    }

    let teacher = Teacher {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        phone: optional_str(req, "phone"),
        assigned_year,
        assigned_subject: optional_str(req, "assignedSubject"),
        created_at: Utc::now(),
    };
    if let Err(e) = conn.insert_teacher(&teacher) {
        return insert_failed(req, "teachers", e);
    }
    info!(teacher_id = %teacher.id, "teacher added");
    ok(&req.id, json!({ "teacher": teacher }))
}

fn handle_teachers_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "teacherId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.delete_teacher(&id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "teacher not found", None),
        Err(e) => delete_failed(req, "teachers", e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.create" => Some(handle_teachers_create(state, req)),
        "teachers.delete" => Some(handle_teachers_delete(state, req)),
        _ => None,
    }
}

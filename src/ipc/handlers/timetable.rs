use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, delete_failed, insert_failed, optional_str, optional_year, query_failed,
    required_str, update_failed,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{check_year, validate_periods, DayOfWeek, PeriodTiming, TimetableEntry};
use crate::store::TimetableStore;
use serde_json::json;
use uuid::Uuid;

fn handle_periods_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match conn.list_periods() {
        Ok(rows) => ok(&req.id, json!({ "periods": rows })),
        Err(e) => query_failed(req, e),
    }
}

fn handle_periods_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let Some(raw) = req.params.get("periods").filter(|v| v.is_array()) else {
        return err(&req.id, "bad_params", "periods must be an array", None);
    };
    let mut periods: Vec<PeriodTiming> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    if let Err(e) = validate_periods(&periods) {
        return err(&req.id, e.code(), e.to_string(), None);
    }
    periods.sort_by_key(|p| p.period_number);
    for p in periods.iter_mut() {
        if p.id.trim().is_empty() {
            p.id = Uuid::new_v4().to_string();
        }
        if p.label.trim().is_empty() {
            p.label = format!("Period {}", p.period_number);
        }
    }
    if let Err(e) = conn.replace_periods(&periods) {
        return update_failed(req, "period_timings", e);
    }
    ok(&req.id, json!({ "periods": periods }))
}

fn handle_timetable_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = optional_str(req, "classId");
    let year = match optional_year(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.list_timetable(class_id.as_deref(), year) {
        Ok(rows) => ok(&req.id, json!({ "entries": rows })),
        Err(e) => query_failed(req, e),
    }
}

fn handle_timetable_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let teacher_name = match required_str(req, "teacherName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let teacher_id = optional_str(req, "teacherId").unwrap_or_default();
    let year = match req.params.get("year").and_then(|v| v.as_i64()) {
        Some(y) => match check_year(y) {
            Ok(y) => y,
            Err(e) => return err(&req.id, e.code(), e.to_string(), None),
        },
        None => return err(&req.id, "bad_params", "missing year", None),
    };
    let day = match required_str(req, "dayOfWeek") {
        Ok(v) => match DayOfWeek::parse(&v) {
            Some(d) => d,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "dayOfWeek must be one of: Monday..Saturday",
                    None,
                )
            }
        },
        Err(e) => return e,
    };
    let period_number = match req.params.get("periodNumber").and_then(|v| v.as_u64()) {
        Some(n) => n as u32,
        None => return err(&req.id, "bad_params", "missing periodNumber", None),
    };

    match conn.get_period(period_number) {
        Ok(Some(p)) if !p.is_break => {}
        Ok(Some(p)) => {
            return err(
                &req.id,
                "validation_failed",
                format!("period {} is a break ({})", period_number, p.label),
                None,
            )
        }
        Ok(None) => {
            return err(
                &req.id,
                "validation_failed",
                format!("period {} does not exist", period_number),
                None,
            )
        }
        Err(e) => return query_failed(req, e),
    }
    match conn.slot_taken(&class_id, day, period_number) {
        Ok(false) => {}
        Ok(true) => {
            return err(
                &req.id,
                "validation_failed",
                "class already has an entry in this slot",
                Some(json!({ "classId": class_id, "dayOfWeek": day, "periodNumber": period_number })),
            )
        }
        Err(e) => return query_failed(req, e),
    }

    let entry = TimetableEntry {
        id: Uuid::new_v4().to_string(),
        class_id,
        year,
        day_of_week: day,
        period_number,
        subject,
        teacher_id,
        teacher_name,
    };
    if let Err(e) = conn.insert_timetable_entry(&entry) {
        return insert_failed(req, "timetable_entries", e);
    }
    ok(&req.id, json!({ "entry": entry }))
}

fn handle_timetable_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let id = match required_str(req, "entryId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.delete_timetable_entry(&id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "timetable entry not found", None),
        Err(e) => delete_failed(req, "timetable_entries", e),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match conn.list_subjects() {
        Ok(rows) => ok(&req.id, json!({ "years": rows })),
        Err(e) => query_failed(req, e),
    }
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match req.params.get("year").and_then(|v| v.as_i64()) {
        Some(y) => match check_year(y) {
            Ok(y) => y,
            Err(e) => return err(&req.id, e.code(), e.to_string(), None),
        },
        None => return err(&req.id, "bad_params", "missing year", None),
    };
    let Some(raw) = req.params.get("subjects").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "subjects must be an array", None);
    };
    let mut subjects: Vec<String> = Vec::with_capacity(raw.len());
    for v in raw {
        let Some(s) = v.as_str() else {
            return err(&req.id, "bad_params", "subjects must be strings", None);
        };
        let s = s.trim();
        if !s.is_empty() && !subjects.iter().any(|x| x.eq_ignore_ascii_case(s)) {
            subjects.push(s.to_string());
        }
    }
    if let Err(e) = conn.set_subjects(year, &subjects) {
        return update_failed(req, "subject_masters", e);
    }
    ok(&req.id, json!({ "year": year, "subjects": subjects }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "periods.list" => Some(handle_periods_list(state, req)),
        "periods.update" => Some(handle_periods_update(state, req)),
        "timetable.list" => Some(handle_timetable_list(state, req)),
        "timetable.create" => Some(handle_timetable_create(state, req)),
        "timetable.delete" => Some(handle_timetable_delete(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.update" => Some(handle_subjects_update(state, req)),
        _ => None,
    }
}

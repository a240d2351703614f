use crate::ipc::error::ok;
use crate::ipc::handlers::setup::band_thresholds;
use crate::ipc::helpers::{db_conn, optional_year, query_failed, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Assignment, PassStatus, Submission};
use crate::performance::{
    analyze_cohort, analyze_student, year_summaries, BandThresholds, PerformanceBand,
    PerformanceRecord, YearResolver,
};
use crate::publisher::PublishState;
use crate::store::{AssignmentStore, PassStore, StaffStore, SubmissionFilter, SubmissionStore};
use rusqlite::Connection;
use serde_json::json;

fn record_json(r: &PerformanceRecord, bands: &BandThresholds) -> serde_json::Value {
    let mut v = json!(r);
    v["band"] = json!(bands.band(r.weekly_average));
    v
}

fn load_inputs(conn: &Connection) -> anyhow::Result<(Vec<Assignment>, Vec<Submission>)> {
    let assignments = conn.list_assignments()?;
    let submissions = conn.list_submissions(&SubmissionFilter::default())?;
    Ok((assignments, submissions))
}

fn handle_performance_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let submissions = match conn.list_submissions(&SubmissionFilter {
        assignment_id: None,
        student_id: Some(student_id.clone()),
    }) {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let bands = match band_thresholds(conn) {
        Ok(b) => b,
        Err(e) => return query_failed(req, e),
    };
    let record = analyze_student(&submissions, &student_id);
    let recent: Vec<serde_json::Value> = submissions
        .iter()
        .map(|s| {
            json!({
                "assignmentId": s.assignment_id,
                "percentage": s.percentage,
                "correctedTime": s.corrected_time,
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "record": record_json(&record, &bands),
            "submissions": recent
        }),
    )
}

fn handle_performance_cohort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year = match optional_year(req, "year") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (assignments, submissions) = match load_inputs(conn) {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let bands = match band_thresholds(conn) {
        Ok(b) => b,
        Err(e) => return query_failed(req, e),
    };
    let years = YearResolver::from_assignments(&assignments);
    let records: Vec<serde_json::Value> = analyze_cohort(&submissions, year, &years)
        .iter()
        .map(|r| record_json(r, &bands))
        .collect();
    ok(&req.id, json!({ "year": year, "records": records }))
}

fn handle_performance_by_year(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (assignments, submissions) = match load_inputs(conn) {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let years = YearResolver::from_assignments(&assignments);
    ok(
        &req.id,
        json!({ "years": year_summaries(&submissions, &years) }),
    )
}

fn handle_dashboard_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let (assignments, submissions) = match load_inputs(conn) {
        Ok(v) => v,
        Err(e) => return query_failed(req, e),
    };
    let pending_passes = match conn.list_passes(Some(PassStatus::Pending), None) {
        Ok(v) => v.len(),
        Err(e) => return query_failed(req, e),
    };
    let teachers = match conn.list_teachers() {
        Ok(v) => v.len(),
        Err(e) => return query_failed(req, e),
    };
    let bands = match band_thresholds(conn) {
        Ok(b) => b,
        Err(e) => return query_failed(req, e),
    };

    let count_state =
        |s: PublishState| assignments.iter().filter(|a| PublishState::of(a) == s).count();
    let years = YearResolver::from_assignments(&assignments);
    let cohort = analyze_cohort(&submissions, None, &years);
    let needs_attention = cohort
        .iter()
        .filter(|r| bands.band(r.weekly_average) == PerformanceBand::NeedsAttention)
        .count();
    let average = if cohort.is_empty() {
        0
    } else {
        let sum: u64 = cohort.iter().map(|r| u64::from(r.weekly_average)).sum();
        (sum as f64 / cohort.len() as f64).round() as u32
    };

    ok(
        &req.id,
        json!({
            "assignments": {
                "total": assignments.len(),
                "draft": count_state(PublishState::Draft),
                "scheduled": count_state(PublishState::Scheduled),
                "published": count_state(PublishState::Published)
            },
            "submissions": submissions.len(),
            "students": cohort.len(),
            "averageScore": average,
            "needsAttention": needs_attention,
            "pendingPassRequests": pending_passes,
            "teachers": teachers,
            "years": year_summaries(&submissions, &years)
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "performance.student" => Some(handle_performance_student(state, req)),
        "performance.cohort" => Some(handle_performance_cohort(state, req)),
        "performance.byYear" => Some(handle_performance_by_year(state, req)),
        "dashboard.overview" => Some(handle_dashboard_overview(state, req)),
        _ => None,
    }
}

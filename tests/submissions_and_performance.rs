mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{
    create_assignment, request_err_code, request_ok, select_workspace, spawn_sidecar,
};

fn submit(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    assignment_id: &str,
    student: &str,
    answers: serde_json::Value,
) -> serde_json::Value {
    let result = request_ok(
        stdin,
        reader,
        id,
        "submissions.submit",
        json!({
            "assignmentId": assignment_id,
            "studentId": student,
            "studentName": format!("Student {}", student),
            "answers": answers
        }),
    );
    result.get("submission").cloned().expect("submission")
}

#[test]
fn submit_grades_and_rejects_duplicates() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-submit");
    let assignment = create_assignment(&mut stdin, &mut reader, "1", "CS-2A", "Arrays");

    let full = submit(
        &mut stdin,
        &mut reader,
        "2",
        &assignment,
        "S1",
        json!({ "Q1": "  o(1) ", "Q2": "a pointer" }),
    );
    assert_eq!(full.get("score").and_then(|v| v.as_u64()), Some(15));
    assert_eq!(full.get("maxScore").and_then(|v| v.as_u64()), Some(15));
    assert_eq!(full.get("percentage").and_then(|v| v.as_u64()), Some(100));
    assert_eq!(
        full.get("feedback")
            .and_then(|f| f.get("Q1"))
            .and_then(|q| q.get("correct"))
            .and_then(|v| v.as_bool()),
        Some(true)
    );

    let partial = submit(
        &mut stdin,
        &mut reader,
        "3",
        &assignment,
        "S2",
        json!({ "Q1": "O(n)", "Q2": "pointer" }),
    );
    assert_eq!(partial.get("score").and_then(|v| v.as_u64()), Some(5));
    assert_eq!(partial.get("percentage").and_then(|v| v.as_u64()), Some(33));
    assert_eq!(
        partial
            .get("feedback")
            .and_then(|f| f.get("Q1"))
            .and_then(|q| q.get("correctAnswer"))
            .and_then(|v| v.as_str()),
        Some("O(1)")
    );

    let dup = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "submissions.submit",
        json!({ "assignmentId": assignment, "studentId": "S1", "answers": { "Q1": "O(1)" } }),
    );
    assert_eq!(dup, "already_submitted");

    let missing = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "submissions.submit",
        json!({ "assignmentId": "nope", "studentId": "S3", "answers": {} }),
    );
    assert_eq!(missing, "not_found");

    let bad = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "submissions.submit",
        json!({ "assignmentId": assignment, "studentId": "S3", "answers": ["O(1)"] }),
    );
    assert_eq!(bad, "bad_params");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "submissions.list",
        json!({ "assignmentId": assignment }),
    );
    let students: Vec<&str> = listed
        .get("submissions")
        .and_then(|v| v.as_array())
        .expect("submissions")
        .iter()
        .filter_map(|s| s.get("studentId").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(students, vec!["S2", "S1"]);

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "assignments.open",
        json!({ "assignmentId": assignment }),
    );
    assert_eq!(opened.get("submissionCount").and_then(|v| v.as_u64()), Some(2));
}

#[test]
fn performance_views_follow_submissions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-performance");
    let first = create_assignment(&mut stdin, &mut reader, "1", "CS-2A", "Week 1");
    let second = create_assignment(&mut stdin, &mut reader, "2", "CS-2A", "Week 2");

    let _ = submit(&mut stdin, &mut reader, "3", &first, "S1", json!({ "Q1": "O(1)", "Q2": "pointer" }));
    let _ = submit(&mut stdin, &mut reader, "4", &first, "S2", json!({ "Q1": "O(n)", "Q2": "pointer" }));
    let _ = submit(&mut stdin, &mut reader, "5", &second, "S1", json!({ "Q1": "O(n)", "Q2": "pointer" }));

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "performance.student",
        json!({ "studentId": "S1" }),
    );
    let record = student.get("record").expect("record");
    assert_eq!(record.get("weeklyAverage").and_then(|v| v.as_u64()), Some(67));
    assert_eq!(record.get("completedAssignments").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(record.get("trend").and_then(|v| v.as_str()), Some("declining"));
    assert_eq!(record.get("band").and_then(|v| v.as_str()), Some("average"));
    assert_eq!(
        student.get("submissions").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );

    let cohort = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "performance.cohort",
        json!({ "year": 2 }),
    );
    let records = cohort
        .get("records")
        .and_then(|v| v.as_array())
        .expect("records");
    let order: Vec<&str> = records
        .iter()
        .filter_map(|r| r.get("studentId").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(order, vec!["S1", "S2"]);
    assert_eq!(
        records[1].get("band").and_then(|v| v.as_str()),
        Some("needsAttention")
    );

    let other_year = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "performance.cohort",
        json!({ "year": 3 }),
    );
    assert_eq!(
        other_year.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let by_year = request_ok(&mut stdin, &mut reader, "9", "performance.byYear", json!({}));
    let years = by_year.get("years").and_then(|v| v.as_array()).expect("years");
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].get("year").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(years[0].get("submissions").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(years[0].get("avgScore").and_then(|v| v.as_u64()), Some(55));

    let dashboard = request_ok(&mut stdin, &mut reader, "10", "dashboard.overview", json!({}));
    assert_eq!(
        dashboard
            .get("assignments")
            .and_then(|a| a.get("published"))
            .and_then(|v| v.as_u64()),
        Some(2)
    );
    assert_eq!(dashboard.get("submissions").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(dashboard.get("students").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(dashboard.get("averageScore").and_then(|v| v.as_u64()), Some(50));
    assert_eq!(dashboard.get("needsAttention").and_then(|v| v.as_u64()), Some(1));
}

#[test]
fn bands_follow_saved_analytics_thresholds() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-performance-bands");
    let assignment = create_assignment(&mut stdin, &mut reader, "1", "CS-1A", "Quiz");
    let _ = submit(&mut stdin, &mut reader, "2", &assignment, "S1", json!({ "Q1": "O(n)", "Q2": "pointer" }));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({
            "section": "analytics",
            "patch": { "excellentThreshold": 50, "goodThreshold": 40, "averageThreshold": 30 }
        }),
    );
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "performance.student",
        json!({ "studentId": "S1" }),
    );
    assert_eq!(
        student
            .get("record")
            .and_then(|r| r.get("band"))
            .and_then(|v| v.as_str()),
        Some("average")
    );
}

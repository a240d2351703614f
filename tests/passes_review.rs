mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, select_workspace, spawn_sidecar};

#[test]
fn pass_requests_are_reviewed_once() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-passes");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "passes.create",
        json!({
            "studentId": "S1",
            "studentName": "Asha",
            "reason": "Dentist appointment",
            "now": "2030-01-05T10:00:00Z"
        }),
    );
    let request = created.get("request").expect("request");
    assert_eq!(request.get("status").and_then(|v| v.as_str()), Some("Pending"));
    assert!(request.get("reviewedBy").map_or(true, |v| v.is_null()));
    let id = request
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "passes.create",
        json!({ "studentId": "S2", "studentName": "Ben", "reason": "Family event" }),
    );

    let pending = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "passes.list",
        json!({ "status": "Pending" }),
    );
    assert_eq!(
        pending.get("requests").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );

    let pending_code = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "passes.review",
        json!({ "requestId": id, "reviewedBy": "T001", "decision": "Pending" }),
    );
    assert_eq!(pending_code, "bad_params");

    let reviewed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "passes.review",
        json!({
            "requestId": id,
            "reviewedBy": "T001",
            "decision": "approved",
            "now": "2030-01-05T11:00:00Z"
        }),
    );
    let r = reviewed.get("request").expect("request");
    assert_eq!(r.get("status").and_then(|v| v.as_str()), Some("Approved"));
    assert_eq!(r.get("reviewedBy").and_then(|v| v.as_str()), Some("T001"));
    assert!(r
        .get("reviewedAt")
        .and_then(|v| v.as_str())
        .is_some_and(|s| s.starts_with("2030-01-05T11:00:00")));

    let again = review_again(&mut stdin, &mut reader, "6", &id);
    assert_eq!(
        again
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("already_reviewed")
    );
    assert_eq!(
        again
            .get("error")
            .and_then(|e| e.get("details"))
            .and_then(|d| d.get("status"))
            .and_then(|v| v.as_str()),
        Some("Approved")
    );

    let missing = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "passes.review",
        json!({ "requestId": "unknown", "reviewedBy": "T001", "decision": "Denied" }),
    );
    assert_eq!(missing, "not_found");

    let approved_for_s1 = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "passes.list",
        json!({ "status": "approved", "studentId": "S1" }),
    );
    assert_eq!(
        approved_for_s1
            .get("requests")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let overview = request_ok(&mut stdin, &mut reader, "9", "dashboard.overview", json!({}));
    assert_eq!(
        overview.get("pendingPassRequests").and_then(|v| v.as_u64()),
        Some(1)
    );
}

fn review_again(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    id: &str,
    request_id: &str,
) -> serde_json::Value {
    test_support::request(
        stdin,
        reader,
        id,
        "passes.review",
        json!({ "requestId": request_id, "reviewedBy": "T002", "decision": "Denied" }),
    )
}

#[test]
fn pass_reason_is_required_and_bounded() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-passes-reason");

    let blank = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "passes.create",
        json!({ "studentId": "S1", "studentName": "Asha", "reason": "   " }),
    );
    assert_eq!(blank, "bad_params");

    let long = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "passes.create",
        json!({ "studentId": "S1", "studentName": "Asha", "reason": "x".repeat(501) }),
    );
    assert_eq!(long, "validation_failed");

    let unknown_status = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "passes.list",
        json!({ "status": "Lost" }),
    );
    assert_eq!(unknown_status, "bad_params");
}

mod test_support;

use serde_json::json;
use test_support::{
    assignment_params, create_assignment, request_err_code, request_ok, select_workspace,
    spawn_sidecar,
};

fn with(mut params: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(p), Some(e)) = (params.as_object_mut(), extra.as_object()) {
        for (k, v) in e {
            p.insert(k.clone(), v.clone());
        }
    }
    params
}

#[test]
fn immediate_create_publishes_and_scheduled_create_waits() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-create");

    let now_published = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.create",
        assignment_params("CS-2A", "Arrays"),
    );
    let a = now_published.get("assignment").expect("assignment");
    assert_eq!(a.get("state").and_then(|v| v.as_str()), Some("published"));
    assert_eq!(a.get("isPublished").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(a.get("totalPoints").and_then(|v| v.as_u64()), Some(15));
    assert!(a.get("scheduledAt").map_or(true, |v| v.is_null()));

    let scheduled = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.create",
        with(
            assignment_params("CS-2A", "Linked lists"),
            json!({ "scheduledAt": "2030-01-10T08:00:00Z", "now": "2030-01-01T00:00:00Z" }),
        ),
    );
    let s = scheduled.get("assignment").expect("assignment");
    assert_eq!(s.get("state").and_then(|v| v.as_str()), Some("scheduled"));
    assert_eq!(s.get("isPublished").and_then(|v| v.as_bool()), Some(false));

    let code = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.create",
        with(
            assignment_params("CS-2A", "Too late"),
            json!({ "scheduledAt": "2029-12-31T23:00:00Z", "now": "2030-01-01T00:00:00Z" }),
        ),
    );
    assert_eq!(code, "schedule_in_past");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.list",
        json!({ "state": "scheduled" }),
    );
    let rows = listed
        .get("assignments")
        .and_then(|v| v.as_array())
        .expect("assignments");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("title").and_then(|v| v.as_str()),
        Some("Linked lists")
    );
    assert_eq!(rows[0].get("questionCount").and_then(|v| v.as_u64()), Some(2));
    assert!(rows[0].get("questions").is_none());
}

#[test]
fn tick_publishes_due_assignments_exactly_once() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-tick");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.create",
        with(
            assignment_params("CS-3B", "Trees"),
            json!({ "scheduledAt": "2030-02-01T09:00:00Z", "now": "2030-01-01T00:00:00Z" }),
        ),
    );
    let id = created
        .get("assignment")
        .and_then(|a| a.get("id"))
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let early = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.tick",
        json!({ "now": "2030-01-31T09:00:00Z" }),
    );
    assert_eq!(
        early.get("published").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let due = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.tick",
        json!({ "now": "2030-02-01T09:00:00Z" }),
    );
    let published: Vec<&str> = due
        .get("published")
        .and_then(|v| v.as_array())
        .expect("published")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(published, vec![id.as_str()]);

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.tick",
        json!({ "now": "2030-02-02T09:00:00Z" }),
    );
    assert_eq!(
        again.get("published").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.open",
        json!({ "assignmentId": id }),
    );
    assert_eq!(
        opened
            .get("assignment")
            .and_then(|a| a.get("state"))
            .and_then(|v| v.as_str()),
        Some("published")
    );
}

#[test]
fn reschedule_and_publish_now_guard_their_states() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-reschedule");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.create",
        with(
            assignment_params("CS-1A", "Recursion"),
            json!({ "scheduledAt": "2030-03-01T09:00:00Z", "now": "2030-01-01T00:00:00Z" }),
        ),
    );
    let id = created
        .get("assignment")
        .and_then(|a| a.get("id"))
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let past = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.reschedule",
        json!({ "assignmentId": id, "scheduledAt": "2029-06-01T09:00:00Z", "now": "2030-01-01T00:00:00Z" }),
    );
    assert_eq!(past, "schedule_in_past");

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.reschedule",
        json!({ "assignmentId": id, "scheduledAt": "2030-04-01T09:00:00Z", "now": "2030-01-01T00:00:00Z" }),
    );
    assert_eq!(
        moved
            .get("assignment")
            .and_then(|a| a.get("scheduledAt"))
            .and_then(|v| v.as_str())
            .map(|s| s.starts_with("2030-04-01T09:00:00")),
        Some(true)
    );

    let published = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.publishNow",
        json!({ "assignmentId": id }),
    );
    let a = published.get("assignment").expect("assignment");
    assert_eq!(a.get("state").and_then(|v| v.as_str()), Some("published"));
    assert!(a.get("scheduledAt").map_or(true, |v| v.is_null()));

    let twice = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.publishNow",
        json!({ "assignmentId": id }),
    );
    assert_eq!(twice, "already_published");

    let not_scheduled = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.reschedule",
        json!({ "assignmentId": id, "scheduledAt": "2031-01-01T09:00:00Z", "now": "2030-01-01T00:00:00Z" }),
    );
    assert_eq!(not_scheduled, "not_scheduled");
}

#[test]
fn create_validates_and_delete_removes() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-delete");

    let mut no_questions = assignment_params("CS-2A", "Empty");
    no_questions["questions"] = json!([]);
    let code = request_err_code(&mut stdin, &mut reader, "1", "assignments.create", no_questions);
    assert_eq!(code, "validation_failed");

    let mut bad_year = assignment_params("CS-2A", "Year 9");
    bad_year["targetYear"] = json!(9);
    let code = request_err_code(&mut stdin, &mut reader, "2", "assignments.create", bad_year);
    assert_eq!(code, "validation_failed");

    let id = create_assignment(&mut stdin, &mut reader, "3", "CS-2A", "Stacks");
    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.delete",
        json!({ "assignmentId": id }),
    );
    assert_eq!(deleted.get("ok").and_then(|v| v.as_bool()), Some(true));

    let gone = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.open",
        json!({ "assignmentId": id }),
    );
    assert_eq!(gone, "not_found");

    let again = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.delete",
        json!({ "assignmentId": id }),
    );
    assert_eq!(again, "not_found");
}

#[test]
fn list_filters_by_year_and_class() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-filters");

    let _ = create_assignment(&mut stdin, &mut reader, "1", "CS-2A", "Year two");
    let _ = create_assignment(&mut stdin, &mut reader, "2", "CS-3A", "Year three");
    let mut explicit = assignment_params("LAB-X", "Explicit year");
    explicit["targetYear"] = json!(2);
    let _ = request_ok(&mut stdin, &mut reader, "3", "assignments.create", explicit);

    let year_two = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.list",
        json!({ "year": 2 }),
    );
    let mut titles: Vec<&str> = year_two
        .get("assignments")
        .and_then(|v| v.as_array())
        .expect("assignments")
        .iter()
        .filter_map(|a| a.get("title").and_then(|v| v.as_str()))
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Explicit year", "Year two"]);

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.list",
        json!({ "classId": "CS-3A" }),
    );
    assert_eq!(
        class.get("assignments").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let bad = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.list",
        json!({ "state": "archived" }),
    );
    assert_eq!(bad, "bad_params");
}

#[test]
fn oversized_points_are_rejected_and_the_daemon_keeps_serving() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-assign-points");

    let mut huge = assignment_params("CS-2A", "Overflow");
    huge["questions"][0]["points"] = json!(u32::MAX);
    huge["questions"][1]["points"] = json!(1);
    let code = request_err_code(&mut stdin, &mut reader, "1", "assignments.create", huge);
    assert_eq!(code, "validation_failed");

    let listed = request_ok(&mut stdin, &mut reader, "2", "assignments.list", json!({}));
    assert_eq!(
        listed.get("assignments").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
}

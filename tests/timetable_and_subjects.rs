mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, select_workspace, spawn_sidecar};

fn entry(class_id: &str, day: &str, period: u32, subject: &str) -> serde_json::Value {
    json!({
        "classId": class_id,
        "year": 2,
        "dayOfWeek": day,
        "periodNumber": period,
        "subject": subject,
        "teacherId": "T001",
        "teacherName": "R. Kumar"
    })
}

#[test]
fn fresh_workspace_has_default_periods_and_subjects() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-periods-default");

    let periods = request_ok(&mut stdin, &mut reader, "1", "periods.list", json!({}));
    let rows = periods.get("periods").and_then(|v| v.as_array()).expect("periods");
    assert_eq!(rows.len(), 8);
    let breaks: Vec<u64> = rows
        .iter()
        .filter(|p| p.get("isBreak").and_then(|v| v.as_bool()) == Some(true))
        .filter_map(|p| p.get("periodNumber").and_then(|v| v.as_u64()))
        .collect();
    assert_eq!(breaks, vec![3, 6]);
    assert_eq!(
        rows[0].get("startTime").and_then(|v| v.as_str()),
        Some("09:00")
    );

    let subjects = request_ok(&mut stdin, &mut reader, "2", "subjects.list", json!({}));
    let years = subjects.get("years").and_then(|v| v.as_array()).expect("years");
    assert_eq!(years.len(), 4);
    assert!(years.iter().all(|y| y
        .get("subjects")
        .and_then(|v| v.as_array())
        .is_some_and(|s| !s.is_empty())));
}

#[test]
fn timetable_entries_respect_breaks_and_slots() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-timetable");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "timetable.create",
        entry("CS-2A", "monday", 1, "Data Structures"),
    );
    let first = created.get("entry").expect("entry");
    assert_eq!(first.get("dayOfWeek").and_then(|v| v.as_str()), Some("Monday"));
    let entry_id = first
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "timetable.create",
        entry("CS-2A", "Tuesday", 2, "Statistics"),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.create",
        entry("CS-2B", "Monday", 1, "Digital Logic"),
    );

    let on_break = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.create",
        entry("CS-2A", "Monday", 3, "Physics"),
    );
    assert_eq!(on_break, "validation_failed");

    let no_period = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.create",
        entry("CS-2A", "Monday", 42, "Physics"),
    );
    assert_eq!(no_period, "validation_failed");

    let taken = request_err_code(
        &mut stdin,
        &mut reader,
        "6",
        "timetable.create",
        entry("CS-2A", "Monday", 1, "Physics"),
    );
    assert_eq!(taken, "validation_failed");

    let sunday = request_err_code(
        &mut stdin,
        &mut reader,
        "7",
        "timetable.create",
        entry("CS-2A", "Sunday", 1, "Physics"),
    );
    assert_eq!(sunday, "bad_params");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.list",
        json!({ "classId": "CS-2A" }),
    );
    let subjects: Vec<&str> = class
        .get("entries")
        .and_then(|v| v.as_array())
        .expect("entries")
        .iter()
        .filter_map(|e| e.get("subject").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(subjects, vec!["Data Structures", "Statistics"]);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.delete",
        json!({ "entryId": entry_id }),
    );
    let missing = request_err_code(
        &mut stdin,
        &mut reader,
        "10",
        "timetable.delete",
        json!({ "entryId": entry_id }),
    );
    assert_eq!(missing, "not_found");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "timetable.create",
        entry("CS-2A", "Monday", 1, "Physics"),
    );
}

#[test]
fn period_and_subject_updates_replace_stored_values() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "campusd-periods-update");

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "periods.update",
        json!({
            "periods": [
                { "periodNumber": 2, "startTime": "10:00", "endTime": "10:45" },
                { "periodNumber": 1, "startTime": "09:00", "endTime": "09:45", "label": "Homeroom" },
                { "periodNumber": 3, "startTime": "10:45", "endTime": "11:00", "isBreak": true }
            ]
        }),
    );
    let rows = updated.get("periods").and_then(|v| v.as_array()).expect("periods");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("label").and_then(|v| v.as_str()), Some("Homeroom"));
    assert_eq!(rows[1].get("label").and_then(|v| v.as_str()), Some("Period 2"));
    assert!(rows
        .iter()
        .all(|p| p.get("id").and_then(|v| v.as_str()).is_some_and(|s| !s.is_empty())));

    let listed = request_ok(&mut stdin, &mut reader, "2", "periods.list", json!({}));
    assert_eq!(
        listed.get("periods").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(3)
    );

    let backwards = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "periods.update",
        json!({ "periods": [ { "periodNumber": 1, "startTime": "10:00", "endTime": "09:00" } ] }),
    );
    assert_eq!(backwards, "validation_failed");

    let subjects = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.update",
        json!({ "year": 2, "subjects": ["Graph Theory", " graph theory ", "", "Data Structures"] }),
    );
    let saved: Vec<&str> = subjects
        .get("subjects")
        .and_then(|v| v.as_array())
        .expect("subjects")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(saved, vec!["Graph Theory", "Data Structures"]);

    let bad_year = request_err_code(
        &mut stdin,
        &mut reader,
        "5",
        "subjects.update",
        json!({ "year": 5, "subjects": ["X"] }),
    );
    assert_eq!(bad_year, "validation_failed");

    let listed = request_ok(&mut stdin, &mut reader, "6", "subjects.list", json!({}));
    let year_two = listed
        .get("years")
        .and_then(|v| v.as_array())
        .and_then(|a| a.iter().find(|y| y.get("year").and_then(|v| v.as_u64()) == Some(2)))
        .cloned()
        .expect("year 2");
    assert_eq!(
        year_two.get("subjects").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
}

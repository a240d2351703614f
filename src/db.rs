use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

pub const DB_FILE: &str = "campus.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    info!(path = %db_path.display(), "workspace database opened");
    Ok(conn)
}

/// Creates tables, runs column migrations and seeds defaults. Safe to call on
/// every open.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            teacher_id TEXT NOT NULL,
            teacher_name TEXT NOT NULL,
            class_id TEXT NOT NULL,
            target_year INTEGER,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            questions_json TEXT NOT NULL,
            due_date TEXT NOT NULL,
            total_points INTEGER NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0,
            scheduled_at TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    // Workspaces created before per-year targeting lack this column.
    ensure_assignments_target_year(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_class ON assignments(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_pending
            ON assignments(is_published, scheduled_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            answers_json TEXT NOT NULL,
            score INTEGER NOT NULL,
            max_score INTEGER NOT NULL,
            percentage INTEGER NOT NULL,
            feedback_json TEXT NOT NULL,
            corrected_time TEXT NOT NULL,
            FOREIGN KEY(assignment_id) REFERENCES assignments(id) ON DELETE CASCADE,
            UNIQUE(assignment_id, student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_student ON submissions(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pass_requests(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            reason TEXT NOT NULL,
            requested_time TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending',
            reviewed_by TEXT,
            reviewed_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_pass_requests_status ON pass_requests(status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS period_timings(
            id TEXT PRIMARY KEY,
            period_number INTEGER NOT NULL UNIQUE,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            is_break INTEGER NOT NULL DEFAULT 0,
            label TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_entries(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            day_of_week TEXT NOT NULL,
            period_number INTEGER NOT NULL,
            subject TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            teacher_name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_slot
            ON timetable_entries(class_id, day_of_week, period_number)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_masters(
            year INTEGER PRIMARY KEY,
            subjects_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            assigned_year INTEGER,
            assigned_subject TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS question_bank(
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            topic TEXT NOT NULL,
            question_json TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_bank_subject ON question_bank(subject, topic)",
        [],
    )?;

    seed_period_timings(conn)?;
    seed_subject_masters(conn)?;
    Ok(())
}

const DEFAULT_PERIODS: [(u32, &str, &str, bool, &str); 8] = [
    (1, "09:00", "09:50", false, "Period 1"),
    (2, "09:50", "10:40", false, "Period 2"),
    (3, "10:40", "11:00", true, "Short Break"),
    (4, "11:00", "11:50", false, "Period 3"),
    (5, "11:50", "12:40", false, "Period 4"),
    (6, "12:40", "13:30", true, "Lunch Break"),
    (7, "13:30", "14:20", false, "Period 5"),
    (8, "14:20", "15:10", false, "Period 6"),
];

fn seed_period_timings(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM period_timings", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    let mut stmt = conn.prepare(
        "INSERT INTO period_timings(id, period_number, start_time, end_time, is_break, label)
         VALUES(?, ?, ?, ?, ?, ?)",
    )?;
    for (number, start, end, is_break, label) in DEFAULT_PERIODS {
        stmt.execute((
            format!("PT{number}"),
            number,
            start,
            end,
            is_break as i64,
            label,
        ))?;
    }
    Ok(())
}

const DEFAULT_SUBJECTS: [(u8, &[&str]); 4] = [
    (1, &["Mathematics I", "Physics", "Programming Fundamentals", "English"]),
    (2, &["Data Structures", "Discrete Mathematics", "Digital Logic", "Statistics"]),
    (3, &["Algorithms", "Database Systems", "Operating Systems", "Computer Networks"]),
    (4, &["Machine Learning", "Software Engineering", "Compiler Design", "Project"]),
];

fn seed_subject_masters(conn: &Connection) -> anyhow::Result<()> {
    for (year, subjects) in DEFAULT_SUBJECTS {
        conn.execute(
            "INSERT OR IGNORE INTO subject_masters(year, subjects_json) VALUES(?, ?)",
            (year, serde_json::to_string(subjects)?),
        )?;
    }
    Ok(())
}

fn ensure_assignments_target_year(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "assignments", "target_year")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE assignments ADD COLUMN target_year INTEGER", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "boletines.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            document_no TEXT,
            current_year INTEGER NOT NULL,
            division TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            sort_order INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_course ON students(current_year, division)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cycles(
            id TEXT PRIMARY KEY,
            label TEXT NOT NULL,
            year INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT,
            year INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_grades(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            cycle_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            is_repeating INTEGER NOT NULL DEFAULT 0,
            valoracion_1c TEXT,
            calificacion_1c INTEGER,
            valoracion_2c TEXT,
            calificacion_2c INTEGER,
            intensificacion_1c INTEGER,
            intensificacion_dic INTEGER,
            intensificacion_feb INTEGER,
            calificacion_final INTEGER,
            observaciones TEXT,
            updated_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(cycle_id) REFERENCES cycles(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            UNIQUE(student_id, cycle_id, subject_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subject_grades_student_cycle
         ON subject_grades(student_id, cycle_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bimester_assessments(
            student_id TEXT NOT NULL,
            cycle_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            bimester INTEGER NOT NULL,
            valoracion TEXT,
            observacion TEXT,
            PRIMARY KEY(student_id, cycle_id, subject_id, bimester),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(cycle_id) REFERENCES cycles(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_groups(
            id TEXT PRIMARY KEY,
            cycle_id TEXT NOT NULL,
            name TEXT NOT NULL,
            code TEXT,
            year INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(cycle_id) REFERENCES cycles(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_group_members(
            group_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            PRIMARY KEY(group_id, subject_id),
            FOREIGN KEY(group_id) REFERENCES subject_groups(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subject_groups_cycle ON subject_groups(cycle_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_assessments(
            group_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            quarter INTEGER NOT NULL,
            calificacion INTEGER,
            valoracion TEXT,
            PRIMARY KEY(group_id, student_id, quarter),
            FOREIGN KEY(group_id) REFERENCES subject_groups(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_days(
            student_id TEXT NOT NULL,
            cycle_id TEXT NOT NULL,
            day TEXT NOT NULL,
            code TEXT NOT NULL,
            PRIMARY KEY(student_id, cycle_id, day),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(cycle_id) REFERENCES cycles(id)
        )",
        [],
    )?;

    Ok(conn)
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

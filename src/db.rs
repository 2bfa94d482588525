use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::grading::round2;

pub const DB_FILE_NAME: &str = "resultsd.sqlite3";

pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

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
        "CREATE TABLE IF NOT EXISTS academic_years(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            is_current INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS standards(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            section TEXT,
            UNIQUE(name, section)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            standard_id TEXT NOT NULL,
            credit_hours TEXT NOT NULL,
            FOREIGN KEY(standard_id) REFERENCES standards(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            admission_number TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            standard_id TEXT NOT NULL,
            academic_year_id TEXT NOT NULL,
            roll_number TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'enrolled',
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(standard_id) REFERENCES standards(id),
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id),
            UNIQUE(student_id, academic_year_id),
            UNIQUE(standard_id, academic_year_id, roll_number)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_group
         ON enrollments(standard_id, academic_year_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exams(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            term TEXT NOT NULL,
            academic_year_id TEXT NOT NULL,
            start_date TEXT,
            end_date TEXT,
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id)
        )",
        [],
    )?;
    ensure_exams_is_published(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS exam_subjects(
            id TEXT PRIMARY KEY,
            exam_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            standard_id TEXT,
            exam_date TEXT,
            full_marks_theory TEXT NOT NULL,
            pass_marks_theory TEXT NOT NULL,
            full_marks_practical TEXT NOT NULL,
            pass_marks_practical TEXT NOT NULL,
            FOREIGN KEY(exam_id) REFERENCES exams(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(standard_id) REFERENCES standards(id),
            UNIQUE(exam_id, subject_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_exam_subjects_exam ON exam_subjects(exam_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_results(
            id TEXT PRIMARY KEY,
            enrollment_id TEXT NOT NULL,
            exam_subject_id TEXT NOT NULL,
            marks_obtained_theory TEXT NOT NULL,
            marks_obtained_practical TEXT NOT NULL,
            subject_grade TEXT NOT NULL,
            subject_grade_point TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(enrollment_id) REFERENCES enrollments(id),
            FOREIGN KEY(exam_subject_id) REFERENCES exam_subjects(id),
            UNIQUE(enrollment_id, exam_subject_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subject_results_exam_subject
         ON subject_results(exam_subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS result_summaries(
            id TEXT PRIMARY KEY,
            enrollment_id TEXT NOT NULL,
            exam_id TEXT NOT NULL,
            academic_year_id TEXT NOT NULL,
            total_marks TEXT NOT NULL,
            percentage TEXT NOT NULL,
            gpa TEXT NOT NULL,
            overall_grade TEXT NOT NULL,
            rank INTEGER,
            FOREIGN KEY(enrollment_id) REFERENCES enrollments(id),
            FOREIGN KEY(exam_id) REFERENCES exams(id),
            FOREIGN KEY(academic_year_id) REFERENCES academic_years(id),
            UNIQUE(enrollment_id, exam_id)
        )",
        [],
    )?;
    ensure_result_summaries_updated_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_result_summaries_exam ON result_summaries(exam_id)",
        [],
    )?;

    Ok(())
}

fn ensure_exams_is_published(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "exams", "is_published")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE exams ADD COLUMN is_published INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

fn ensure_result_summaries_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "result_summaries", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE result_summaries ADD COLUMN updated_at TEXT", [])?;
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

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> rusqlite::Result<()> {
    let text =
        serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, text),
    )?;
    Ok(())
}

/// Read a decimal stored as TEXT.
pub fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Canonical TEXT form of a stored decimal: two fractional digits.
pub fn decimal_text(value: Decimal) -> String {
    round2(value).to_string()
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

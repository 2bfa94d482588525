//! Enrollment and exam providers backed by the workspace tables, plus the
//! registration writes that populate them.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use crate::db::{decimal_at, decimal_text};
use crate::error::{EngineError, EngineResult};
use crate::model::{Enrollment, EnrollmentStatus, Exam, ExamSubjectSpec, ExamTerm};

const ENROLLMENT_COLUMNS: &str =
    "id, student_id, standard_id, academic_year_id, roll_number, status";
const EXAM_COLUMNS: &str =
    "id, name, term, academic_year_id, start_date, end_date, is_published";
const EXAM_SUBJECT_COLUMNS: &str = "id, exam_id, subject_id, standard_id, exam_date,
    full_marks_theory, pass_marks_theory, full_marks_practical, pass_marks_practical";

fn unknown_enum(idx: usize, kind: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {}: {}", kind, value).into(),
    )
}

fn enrollment_from_row(r: &Row<'_>) -> rusqlite::Result<Enrollment> {
    let status: String = r.get(5)?;
    Ok(Enrollment {
        id: r.get(0)?,
        student_id: r.get(1)?,
        standard_id: r.get(2)?,
        academic_year_id: r.get(3)?,
        roll_number: r.get(4)?,
        status: EnrollmentStatus::parse(&status)
            .ok_or_else(|| unknown_enum(5, "enrollment status", &status))?,
    })
}

fn exam_from_row(r: &Row<'_>) -> rusqlite::Result<Exam> {
    let term: String = r.get(2)?;
    Ok(Exam {
        id: r.get(0)?,
        name: r.get(1)?,
        term: ExamTerm::parse(&term).ok_or_else(|| unknown_enum(2, "exam term", &term))?,
        academic_year_id: r.get(3)?,
        start_date: r.get(4)?,
        end_date: r.get(5)?,
        is_published: r.get::<_, i64>(6)? != 0,
    })
}

fn exam_subject_from_row(r: &Row<'_>) -> rusqlite::Result<ExamSubjectSpec> {
    exam_subject_at(r, 0)
}

/// Decode `EXAM_SUBJECT_COLUMNS` starting at column `base`.
pub(crate) fn exam_subject_at(r: &Row<'_>, base: usize) -> rusqlite::Result<ExamSubjectSpec> {
    Ok(ExamSubjectSpec {
        id: r.get(base)?,
        exam_id: r.get(base + 1)?,
        subject_id: r.get(base + 2)?,
        standard_id: r.get(base + 3)?,
        exam_date: r.get(base + 4)?,
        full_marks_theory: decimal_at(r, base + 5)?,
        pass_marks_theory: decimal_at(r, base + 6)?,
        full_marks_practical: decimal_at(r, base + 7)?,
        pass_marks_practical: decimal_at(r, base + 8)?,
    })
}

pub fn enrollment(conn: &Connection, id: &str) -> EngineResult<Option<Enrollment>> {
    let sql = format!("SELECT {} FROM enrollments WHERE id = ?", ENROLLMENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], enrollment_from_row).optional()?)
}

pub fn exam(conn: &Connection, id: &str) -> EngineResult<Option<Exam>> {
    let sql = format!("SELECT {} FROM exams WHERE id = ?", EXAM_COLUMNS);
    Ok(conn.query_row(&sql, [id], exam_from_row).optional()?)
}

pub fn exam_subject(conn: &Connection, id: &str) -> EngineResult<Option<ExamSubjectSpec>> {
    let sql = format!("SELECT {} FROM exam_subjects WHERE id = ?", EXAM_SUBJECT_COLUMNS);
    Ok(conn.query_row(&sql, [id], exam_subject_from_row).optional()?)
}

pub fn require_enrollment(conn: &Connection, id: &str) -> EngineResult<Enrollment> {
    enrollment(conn, id)?.ok_or_else(|| EngineError::not_found("enrollment", id))
}

pub fn require_exam(conn: &Connection, id: &str) -> EngineResult<Exam> {
    exam(conn, id)?.ok_or_else(|| EngineError::not_found("exam", id))
}

pub fn require_exam_subject(conn: &Connection, id: &str) -> EngineResult<ExamSubjectSpec> {
    exam_subject(conn, id)?.ok_or_else(|| EngineError::not_found("exam subject", id))
}

pub fn exam_subjects_of(conn: &Connection, exam_id: &str) -> EngineResult<Vec<ExamSubjectSpec>> {
    let sql = format!(
        "SELECT {} FROM exam_subjects WHERE exam_id = ? ORDER BY rowid",
        EXAM_SUBJECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([exam_id], exam_subject_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Enrollments of one class-group with status `enrolled`, in roll-number order.
pub fn enrolled_in(
    conn: &Connection,
    standard_id: &str,
    academic_year_id: &str,
) -> EngineResult<Vec<Enrollment>> {
    let sql = format!(
        "SELECT {} FROM enrollments
         WHERE standard_id = ? AND academic_year_id = ? AND status = 'enrolled'
         ORDER BY CAST(roll_number AS INTEGER), roll_number, id",
        ENROLLMENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((standard_id, academic_year_id), enrollment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn exists(conn: &Connection, table: &'static str, id: &str) -> EngineResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

fn require_row(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: &str,
) -> EngineResult<()> {
    if exists(conn, table, id)? {
        Ok(())
    } else {
        Err(EngineError::not_found(entity, id))
    }
}

pub fn require_standard(conn: &Connection, id: &str) -> EngineResult<()> {
    require_row(conn, "standards", "standard", id)
}

pub fn require_academic_year(conn: &Connection, id: &str) -> EngineResult<()> {
    require_row(conn, "academic_years", "academic year", id)
}

/// Largest full or pass mark an exam-subject accepts (five digits, two of them fractional).
pub const MAX_MARKS: Decimal = dec!(999.99);
pub const MAX_CREDIT_HOURS: Decimal = dec!(99.9);

fn check_bounded(field: &'static str, v: Decimal, max: Decimal, places: u32) -> EngineResult<()> {
    if v < Decimal::ZERO || v > max {
        return Err(EngineError::validation_with(
            format!("{} must be between 0 and {}", field, max),
            json!({ "field": field, "value": v }),
        ));
    }
    if v.round_dp(places) != v {
        return Err(EngineError::validation_with(
            format!("{} allows at most {} decimal places", field, places),
            json!({ "field": field, "value": v }),
        ));
    }
    Ok(())
}

fn non_empty(field: &str, value: &str) -> EngineResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(EngineError::validation(format!("{} must not be empty", field)));
    }
    Ok(v.to_string())
}

pub fn create_academic_year(conn: &Connection, name: &str, is_current: bool) -> EngineResult<String> {
    let name = non_empty("name", name)?;
    let id = Uuid::new_v4().to_string();
    let tx = conn.unchecked_transaction()?;
    if is_current {
        tx.execute("UPDATE academic_years SET is_current = 0", [])?;
    }
    tx.execute(
        "INSERT INTO academic_years(id, name, is_current) VALUES(?, ?, ?)",
        (&id, &name, is_current as i64),
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn create_standard(conn: &Connection, name: &str, section: Option<&str>) -> EngineResult<String> {
    let name = non_empty("name", name)?;
    let section = section.map(str::trim).filter(|s| !s.is_empty());
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO standards(id, name, section) VALUES(?, ?, ?)",
        (&id, &name, section),
    )?;
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub standard_id: String,
    pub credit_hours: Decimal,
}

pub fn create_subject(conn: &Connection, subject: &NewSubject) -> EngineResult<String> {
    let name = non_empty("name", &subject.name)?;
    let code = non_empty("code", &subject.code)?;
    check_bounded("creditHours", subject.credit_hours, MAX_CREDIT_HOURS, 1)?;
    require_row(conn, "standards", "standard", &subject.standard_id)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subjects(id, name, code, standard_id, credit_hours) VALUES(?, ?, ?, ?, ?)",
        (
            &id,
            &name,
            &code,
            &subject.standard_id,
            subject.credit_hours.round_dp(1).to_string(),
        ),
    )?;
    Ok(id)
}

pub fn create_student(
    conn: &Connection,
    first_name: &str,
    last_name: &str,
    admission_number: &str,
) -> EngineResult<String> {
    let first_name = non_empty("firstName", first_name)?;
    let last_name = non_empty("lastName", last_name)?;
    let admission_number = non_empty("admissionNumber", admission_number)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, first_name, last_name, admission_number) VALUES(?, ?, ?, ?)",
        (&id, &first_name, &last_name, &admission_number),
    )?;
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: String,
    pub standard_id: String,
    pub academic_year_id: String,
    pub roll_number: String,
    pub status: EnrollmentStatus,
}

pub fn create_enrollment(conn: &Connection, e: &NewEnrollment) -> EngineResult<String> {
    let roll_number = non_empty("rollNumber", &e.roll_number)?;
    require_row(conn, "students", "student", &e.student_id)?;
    require_row(conn, "standards", "standard", &e.standard_id)?;
    require_row(conn, "academic_years", "academic year", &e.academic_year_id)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO enrollments(id, student_id, standard_id, academic_year_id, roll_number, status)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &id,
            &e.student_id,
            &e.standard_id,
            &e.academic_year_id,
            &roll_number,
            e.status.as_str(),
        ),
    )?;
    Ok(id)
}

/// Existing results and summaries are kept; only new writes are gated on status.
pub fn set_enrollment_status(
    conn: &Connection,
    id: &str,
    status: EnrollmentStatus,
) -> EngineResult<()> {
    let changed = conn.execute(
        "UPDATE enrollments SET status = ? WHERE id = ?",
        (status.as_str(), id),
    )?;
    if changed == 0 {
        return Err(EngineError::not_found("enrollment", id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub name: String,
    pub term: ExamTerm,
    pub academic_year_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub fn create_exam(conn: &Connection, exam: &NewExam) -> EngineResult<String> {
    let name = non_empty("name", &exam.name)?;
    require_row(conn, "academic_years", "academic year", &exam.academic_year_id)?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO exams(id, name, term, academic_year_id, start_date, end_date, is_published)
         VALUES(?, ?, ?, ?, ?, ?, 0)",
        (
            &id,
            &name,
            exam.term.as_str(),
            &exam.academic_year_id,
            &exam.start_date,
            &exam.end_date,
        ),
    )?;
    Ok(id)
}

pub fn set_exam_published(conn: &Connection, id: &str, published: bool) -> EngineResult<()> {
    let changed = conn.execute(
        "UPDATE exams SET is_published = ? WHERE id = ?",
        (published as i64, id),
    )?;
    if changed == 0 {
        return Err(EngineError::not_found("exam", id));
    }
    Ok(())
}

/// Marks configuration of a new exam-subject. `None` takes the usual 75/27 + 25/9 split.
#[derive(Debug, Clone, Default)]
pub struct NewExamSubject {
    pub exam_id: String,
    pub subject_id: String,
    pub exam_date: Option<String>,
    pub full_marks_theory: Option<Decimal>,
    pub pass_marks_theory: Option<Decimal>,
    pub full_marks_practical: Option<Decimal>,
    pub pass_marks_practical: Option<Decimal>,
}

pub fn create_exam_subject(conn: &Connection, es: &NewExamSubject) -> EngineResult<String> {
    let full_theory = es.full_marks_theory.unwrap_or(dec!(75.00));
    let pass_theory = es.pass_marks_theory.unwrap_or(dec!(27.00));
    let full_practical = es.full_marks_practical.unwrap_or(dec!(25.00));
    let pass_practical = es.pass_marks_practical.unwrap_or(dec!(9.00));

    for (field, v) in [
        ("fullMarksTheory", full_theory),
        ("passMarksTheory", pass_theory),
        ("fullMarksPractical", full_practical),
        ("passMarksPractical", pass_practical),
    ] {
        check_bounded(field, v, MAX_MARKS, 2)?;
    }
    if pass_theory > full_theory {
        return Err(EngineError::validation_with(
            "passMarksTheory cannot exceed fullMarksTheory",
            json!({ "passMarksTheory": pass_theory, "fullMarksTheory": full_theory }),
        ));
    }
    if pass_practical > full_practical {
        return Err(EngineError::validation_with(
            "passMarksPractical cannot exceed fullMarksPractical",
            json!({ "passMarksPractical": pass_practical, "fullMarksPractical": full_practical }),
        ));
    }

    require_row(conn, "exams", "exam", &es.exam_id)?;
    let standard_id: Option<String> = conn
        .query_row(
            "SELECT standard_id FROM subjects WHERE id = ?",
            [&es.subject_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(standard_id) = standard_id else {
        return Err(EngineError::not_found("subject", &es.subject_id));
    };

    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO exam_subjects(
            id, exam_id, subject_id, standard_id, exam_date,
            full_marks_theory, pass_marks_theory, full_marks_practical, pass_marks_practical
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &es.exam_id,
            &es.subject_id,
            &standard_id,
            &es.exam_date,
            decimal_text(full_theory),
            decimal_text(pass_theory),
            decimal_text(full_practical),
            decimal_text(pass_practical),
        ),
    )?;
    Ok(id)
}

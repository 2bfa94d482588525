use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::db::{decimal_at, decimal_text, now_rfc3339};
use crate::error::{EngineError, EngineResult};
use crate::grading::{compute_grade, Grade};
use crate::model::{EnrollmentStatus, ExamSubjectSpec, SubjectResult};
use crate::registry;
use crate::summary;

const RESULT_COLUMNS: &str = "r.id, r.enrollment_id, r.exam_subject_id,
    r.marks_obtained_theory, r.marks_obtained_practical,
    r.subject_grade, r.subject_grade_point, r.updated_at";

fn subject_result_from_row(r: &Row<'_>) -> rusqlite::Result<SubjectResult> {
    let grade: String = r.get(5)?;
    Ok(SubjectResult {
        id: r.get(0)?,
        student_enrollment_id: r.get(1)?,
        exam_subject_id: r.get(2)?,
        marks_obtained_theory: decimal_at(r, 3)?,
        marks_obtained_practical: decimal_at(r, 4)?,
        subject_grade: Grade::parse(&grade).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                format!("unknown grade: {}", grade).into(),
            )
        })?,
        subject_grade_point: decimal_at(r, 6)?,
        updated_at: r.get(7)?,
    })
}

/// A stored result together with the marks configuration it was graded against.
#[derive(Debug, Clone)]
pub struct GradedSubject {
    pub result: SubjectResult,
    pub spec: ExamSubjectSpec,
}

pub fn find(
    conn: &Connection,
    enrollment_id: &str,
    exam_subject_id: &str,
) -> EngineResult<Option<SubjectResult>> {
    let sql = format!(
        "SELECT {} FROM subject_results r WHERE r.enrollment_id = ? AND r.exam_subject_id = ?",
        RESULT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, (enrollment_id, exam_subject_id), subject_result_from_row)
        .optional()?)
}

/// All results of one student for one exam, in exam-subject creation order.
pub fn list_for(
    conn: &Connection,
    enrollment_id: &str,
    exam_id: &str,
) -> EngineResult<Vec<GradedSubject>> {
    let sql = format!(
        "SELECT {},
           es.id, es.exam_id, es.subject_id, es.standard_id, es.exam_date,
           es.full_marks_theory, es.pass_marks_theory,
           es.full_marks_practical, es.pass_marks_practical
         FROM subject_results r
         JOIN exam_subjects es ON es.id = r.exam_subject_id
         WHERE r.enrollment_id = ? AND es.exam_id = ?
         ORDER BY es.rowid",
        RESULT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((enrollment_id, exam_id), |r| {
            Ok(GradedSubject {
                result: subject_result_from_row(r)?,
                spec: registry::exam_subject_at(r, 8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn check_component(
    field: &'static str,
    obtained: Decimal,
    full: Decimal,
) -> EngineResult<()> {
    if obtained < Decimal::ZERO {
        return Err(EngineError::validation_with(
            format!("{} cannot be negative", field),
            json!({ "field": field, "value": obtained }),
        ));
    }
    if obtained.round_dp(2) != obtained {
        return Err(EngineError::validation_with(
            format!("{} allows at most 2 decimal places", field),
            json!({ "field": field, "value": obtained }),
        ));
    }
    if obtained > full {
        return Err(EngineError::validation_with(
            format!("{} cannot exceed {}", field, full),
            json!({ "field": field, "value": obtained, "fullMarks": full }),
        ));
    }
    Ok(())
}

/// Validate, grade and upsert one result. Does not open a transaction and does
/// not touch the summary; see [`record_subject_result`].
pub fn upsert(
    conn: &Connection,
    enrollment_id: &str,
    exam_subject_id: &str,
    theory: Decimal,
    practical: Decimal,
) -> EngineResult<(SubjectResult, ExamSubjectSpec)> {
    let enrollment = registry::require_enrollment(conn, enrollment_id)?;
    let spec = registry::require_exam_subject(conn, exam_subject_id)?;

    if enrollment.status != EnrollmentStatus::Enrolled {
        return Err(EngineError::validation_with(
            "results can only be recorded for enrolled students",
            json!({ "status": enrollment.status.as_str() }),
        ));
    }
    let exam = registry::require_exam(conn, &spec.exam_id)?;
    if exam.academic_year_id != enrollment.academic_year_id {
        return Err(EngineError::validation_with(
            "exam and enrollment belong to different academic years",
            json!({
                "examAcademicYearId": exam.academic_year_id,
                "enrollmentAcademicYearId": enrollment.academic_year_id
            }),
        ));
    }
    check_component("marksObtainedTheory", theory, spec.full_marks_theory)?;
    check_component("marksObtainedPractical", practical, spec.full_marks_practical)?;

    let (grade, grade_point) = compute_grade(
        theory,
        practical,
        spec.full_marks_theory,
        spec.full_marks_practical,
    )?;

    let result_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO subject_results(
            id, enrollment_id, exam_subject_id,
            marks_obtained_theory, marks_obtained_practical,
            subject_grade, subject_grade_point, updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(enrollment_id, exam_subject_id) DO UPDATE SET
           marks_obtained_theory = excluded.marks_obtained_theory,
           marks_obtained_practical = excluded.marks_obtained_practical,
           subject_grade = excluded.subject_grade,
           subject_grade_point = excluded.subject_grade_point,
           updated_at = excluded.updated_at",
        (
            &result_id,
            enrollment_id,
            exam_subject_id,
            decimal_text(theory),
            decimal_text(practical),
            grade.as_str(),
            decimal_text(grade_point),
            now_rfc3339(),
        ),
    )?;

    let stored = find(conn, enrollment_id, exam_subject_id)?
        .ok_or_else(|| EngineError::not_found("subject result", exam_subject_id))?;
    Ok((stored, spec))
}

/// Record marks for one (enrollment, exam-subject) pair and bring the student's
/// exam summary up to date, atomically.
pub fn record_subject_result(
    conn: &Connection,
    enrollment_id: &str,
    exam_subject_id: &str,
    theory: Decimal,
    practical: Decimal,
) -> EngineResult<SubjectResult> {
    let tx = conn.unchecked_transaction()?;
    let (result, spec) = upsert(&tx, enrollment_id, exam_subject_id, theory, practical)?;
    summary::recompute(&tx, enrollment_id, &spec.exam_id)?;
    tx.commit()?;
    tracing::debug!(
        enrollment = enrollment_id,
        exam_subject = exam_subject_id,
        grade = %result.subject_grade,
        "subject result recorded"
    );
    Ok(result)
}

/// Remove one result and recompute the owning summary. Returns whether a row
/// was removed; an absent row is a no-op.
pub fn remove_subject_result(
    conn: &Connection,
    enrollment_id: &str,
    exam_subject_id: &str,
) -> EngineResult<bool> {
    let tx = conn.unchecked_transaction()?;
    let Some(spec) = registry::exam_subject(&tx, exam_subject_id)? else {
        return Ok(false);
    };
    let removed = tx.execute(
        "DELETE FROM subject_results WHERE enrollment_id = ? AND exam_subject_id = ?",
        (enrollment_id, exam_subject_id),
    )?;
    if removed == 0 {
        return Ok(false);
    }
    summary::recompute(&tx, enrollment_id, &spec.exam_id)?;
    tx.commit()?;
    tracing::debug!(
        enrollment = enrollment_id,
        exam_subject = exam_subject_id,
        "subject result removed"
    );
    Ok(true)
}

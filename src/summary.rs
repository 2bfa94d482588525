use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{decimal_at, decimal_text, now_rfc3339};
use crate::error::EngineResult;
use crate::grading::{percent_of, round2, OverallGradePolicy};
use crate::model::StudentResultSummary;
use crate::registry;
use crate::settings;
use crate::store::{self, GradedSubject};

const SUMMARY_COLUMNS: &str = "id, enrollment_id, exam_id, academic_year_id,
    total_marks, percentage, gpa, overall_grade, rank, updated_at";

fn summary_from_row(r: &Row<'_>) -> rusqlite::Result<StudentResultSummary> {
    Ok(StudentResultSummary {
        id: r.get(0)?,
        student_enrollment_id: r.get(1)?,
        exam_id: r.get(2)?,
        academic_year_id: r.get(3)?,
        total_marks: decimal_at(r, 4)?,
        percentage: decimal_at(r, 5)?,
        gpa: decimal_at(r, 6)?,
        overall_grade: r.get(7)?,
        rank: r.get(8)?,
        updated_at: r.get(9)?,
    })
}

pub fn get_summary(
    conn: &Connection,
    enrollment_id: &str,
    exam_id: &str,
) -> EngineResult<Option<StudentResultSummary>> {
    let sql = format!(
        "SELECT {} FROM result_summaries WHERE enrollment_id = ? AND exam_id = ?",
        SUMMARY_COLUMNS
    );
    Ok(conn
        .query_row(&sql, (enrollment_id, exam_id), summary_from_row)
        .optional()?)
}

/// Derived figures of one summary, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFigures {
    pub total_marks: Decimal,
    pub percentage: Decimal,
    pub gpa: Decimal,
    pub overall_grade: String,
}

/// Aggregate a non-empty set of subject results.
///
/// Any NG subject zeroes the GPA and makes the overall grade NG. The percentage
/// is taken against the full marks of the contributing exam-subjects only.
pub fn aggregate(rows: &[GradedSubject], policy: OverallGradePolicy) -> EngineResult<SummaryFigures> {
    let mut total = Decimal::ZERO;
    let mut possible = Decimal::ZERO;
    let mut grade_points = Decimal::ZERO;
    let mut has_failure = false;
    for row in rows {
        total += row.result.total_obtained();
        possible += row.spec.total_full_marks();
        grade_points += row.result.subject_grade_point;
        has_failure |= row.result.subject_grade.is_failing();
    }

    let avg_gpa = if rows.is_empty() {
        Decimal::ZERO
    } else {
        grade_points / Decimal::from(rows.len())
    };
    let gpa = if has_failure {
        round2(Decimal::ZERO)
    } else {
        round2(avg_gpa)
    };

    Ok(SummaryFigures {
        total_marks: round2(total),
        percentage: round2(percent_of(total, possible)?),
        overall_grade: policy.overall_grade(gpa, has_failure),
        gpa,
    })
}

fn delete_summary(conn: &Connection, enrollment_id: &str, exam_id: &str) -> EngineResult<bool> {
    let removed = conn.execute(
        "DELETE FROM result_summaries WHERE enrollment_id = ? AND exam_id = ?",
        (enrollment_id, exam_id),
    )?;
    Ok(removed > 0)
}

fn unchanged(existing: &StudentResultSummary, figures: &SummaryFigures, academic_year_id: &str) -> bool {
    existing.total_marks == figures.total_marks
        && existing.percentage == figures.percentage
        && existing.gpa == figures.gpa
        && existing.overall_grade == figures.overall_grade
        && existing.academic_year_id == academic_year_id
}

/// Rebuild the summary of one (enrollment, exam) pair from its subject results.
///
/// Deletes the summary when no results remain, or when the enrollment or exam no
/// longer exists. `rank` is carried over untouched; ranking is a separate step.
/// The row is only rewritten when a derived field changed.
pub fn recompute(
    conn: &Connection,
    enrollment_id: &str,
    exam_id: &str,
) -> EngineResult<Option<StudentResultSummary>> {
    let enrollment = registry::enrollment(conn, enrollment_id)?;
    let exam = registry::exam(conn, exam_id)?;
    let Some(enrollment) = enrollment else {
        tracing::warn!(
            enrollment = enrollment_id,
            exam = exam_id,
            "recompute for missing enrollment; dropping stale summary"
        );
        delete_summary(conn, enrollment_id, exam_id)?;
        return Ok(None);
    };
    if exam.is_none() {
        tracing::warn!(
            enrollment = enrollment_id,
            exam = exam_id,
            "recompute for missing exam; dropping stale summary"
        );
        delete_summary(conn, enrollment_id, exam_id)?;
        return Ok(None);
    }

    let rows = store::list_for(conn, enrollment_id, exam_id)?;
    if rows.is_empty() {
        if delete_summary(conn, enrollment_id, exam_id)? {
            tracing::debug!(enrollment = enrollment_id, exam = exam_id, "summary deleted");
        }
        return Ok(None);
    }

    let policy = settings::overall_grade_policy(conn)?;
    let figures = aggregate(&rows, policy)?;

    match get_summary(conn, enrollment_id, exam_id)? {
        Some(existing) if unchanged(&existing, &figures, &enrollment.academic_year_id) => {
            return Ok(Some(existing));
        }
        Some(existing) => {
            conn.execute(
                "UPDATE result_summaries
                 SET academic_year_id = ?, total_marks = ?, percentage = ?, gpa = ?,
                     overall_grade = ?, updated_at = ?
                 WHERE id = ?",
                (
                    &enrollment.academic_year_id,
                    decimal_text(figures.total_marks),
                    decimal_text(figures.percentage),
                    decimal_text(figures.gpa),
                    &figures.overall_grade,
                    now_rfc3339(),
                    &existing.id,
                ),
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO result_summaries(
                    id, enrollment_id, exam_id, academic_year_id,
                    total_marks, percentage, gpa, overall_grade, rank, updated_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)",
                (
                    Uuid::new_v4().to_string(),
                    enrollment_id,
                    exam_id,
                    &enrollment.academic_year_id,
                    decimal_text(figures.total_marks),
                    decimal_text(figures.percentage),
                    decimal_text(figures.gpa),
                    &figures.overall_grade,
                    now_rfc3339(),
                ),
            )?;
        }
    }
    tracing::debug!(
        enrollment = enrollment_id,
        exam = exam_id,
        gpa = %figures.gpa,
        overall = %figures.overall_grade,
        "summary recomputed"
    );
    get_summary(conn, enrollment_id, exam_id)
}

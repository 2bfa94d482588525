//! Read model joining one student's subject results and exam summary.

use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::grading::Grade;
use crate::registry;
use crate::store;
use crate::summary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksheetRow {
    pub exam_subject_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub full_marks_theory: Decimal,
    pub pass_marks_theory: Decimal,
    pub full_marks_practical: Decimal,
    pub pass_marks_practical: Decimal,
    pub marks_obtained_theory: Decimal,
    pub marks_obtained_practical: Decimal,
    pub total_marks: Decimal,
    pub subject_grade: Grade,
    pub subject_grade_point: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marksheet {
    pub student_enrollment_id: String,
    pub student_id: String,
    pub student_full_name: String,
    pub roll_number: String,
    pub standard_id: String,
    pub standard: String,
    pub exam_id: String,
    pub exam_name: String,
    pub is_published: bool,
    pub subjects: Vec<MarksheetRow>,
    pub total_marks: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub gpa: Option<Decimal>,
    pub overall_grade: Option<String>,
    pub rank: Option<i64>,
}

pub fn build_marksheet(
    conn: &Connection,
    enrollment_id: &str,
    exam_id: &str,
) -> EngineResult<Marksheet> {
    let enrollment = registry::require_enrollment(conn, enrollment_id)?;
    let exam = registry::require_exam(conn, exam_id)?;

    let (first, last): (String, String) = conn
        .query_row(
            "SELECT first_name, last_name FROM students WHERE id = ?",
            [&enrollment.student_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("student", &enrollment.student_id))?;
    let standard: String = conn
        .query_row(
            "SELECT CASE WHEN section IS NULL THEN name ELSE name || ' ' || section END
             FROM standards WHERE id = ?",
            [&enrollment.standard_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| EngineError::not_found("standard", &enrollment.standard_id))?;

    let mut subject_names = conn.prepare("SELECT name FROM subjects WHERE id = ?")?;
    let mut subjects = Vec::new();
    for row in store::list_for(conn, enrollment_id, exam_id)? {
        let subject_name: String = subject_names
            .query_row([&row.spec.subject_id], |r| r.get(0))
            .optional()?
            .unwrap_or_default();
        subjects.push(MarksheetRow {
            exam_subject_id: row.spec.id.clone(),
            subject_id: row.spec.subject_id.clone(),
            subject_name,
            full_marks_theory: row.spec.full_marks_theory,
            pass_marks_theory: row.spec.pass_marks_theory,
            full_marks_practical: row.spec.full_marks_practical,
            pass_marks_practical: row.spec.pass_marks_practical,
            total_marks: row.result.total_obtained(),
            marks_obtained_theory: row.result.marks_obtained_theory,
            marks_obtained_practical: row.result.marks_obtained_practical,
            subject_grade: row.result.subject_grade,
            subject_grade_point: row.result.subject_grade_point,
        });
    }

    let summary = summary::get_summary(conn, enrollment_id, exam_id)?;
    Ok(Marksheet {
        student_enrollment_id: enrollment.id,
        student_id: enrollment.student_id,
        student_full_name: format!("{} {}", first, last).trim().to_string(),
        roll_number: enrollment.roll_number,
        standard_id: enrollment.standard_id,
        standard,
        exam_id: exam.id,
        exam_name: exam.name,
        is_published: exam.is_published,
        subjects,
        total_marks: summary.as_ref().map(|s| s.total_marks),
        percentage: summary.as_ref().map(|s| s.percentage),
        gpa: summary.as_ref().map(|s| s.gpa),
        overall_grade: summary.as_ref().map(|s| s.overall_grade.clone()),
        rank: summary.and_then(|s| s.rank),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::run_ranking;
    use crate::store::record_subject_result;
    use crate::test_support::School;
    use rust_decimal_macros::dec;

    #[test]
    fn marksheet_lists_subjects_and_summary() {
        let school = School::new();
        let math = school.exam_subject("MATH", dec!(75), dec!(25));
        let kid = school.enroll("4");
        record_subject_result(&school.conn, &kid, &math, dec!(70), dec!(20)).expect("math");
        run_ranking(&school.conn, &school.exam, &school.standard, &school.year).expect("rank");

        let sheet = build_marksheet(&school.conn, &kid, &school.exam).expect("marksheet");
        assert_eq!(sheet.student_full_name, "Student 4");
        assert_eq!(sheet.standard, "Grade 8 A");
        assert_eq!(sheet.roll_number, "4");
        assert!(!sheet.is_published);
        assert_eq!(sheet.subjects.len(), 1);
        assert_eq!(sheet.subjects[0].subject_name, "MATH");
        assert_eq!(sheet.subjects[0].subject_grade, Grade::APlus);
        assert_eq!(sheet.subjects[0].total_marks, dec!(90));
        assert_eq!(sheet.overall_grade.as_deref(), Some("PASS"));
        assert_eq!(sheet.rank, Some(1));
    }

    #[test]
    fn marksheet_without_results_has_no_summary() {
        let school = School::new();
        let kid = school.enroll("1");
        let sheet = build_marksheet(&school.conn, &kid, &school.exam).expect("marksheet");
        assert!(sheet.subjects.is_empty());
        assert!(sheet.gpa.is_none());
        assert!(sheet.rank.is_none());
    }
}

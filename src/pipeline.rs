//! Full-exam batch: recompute every enrolled student's summary, then rank each
//! standard once.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::Connection;

use crate::error::EngineResult;
use crate::rank;
use crate::registry;
use crate::summary;

/// Returns `standard_id -> summaries processed` for every standard the exam covers.
///
/// Students without results are skipped and not counted. Only storage errors
/// and an unknown exam abort the run.
pub fn run_full_exam_pipeline(
    conn: &Connection,
    exam_id: &str,
) -> EngineResult<BTreeMap<String, usize>> {
    let exam = registry::require_exam(conn, exam_id)?;

    let mut standards = BTreeSet::new();
    for es in registry::exam_subjects_of(conn, exam_id)? {
        match es.standard_id {
            Some(standard_id) => {
                standards.insert(standard_id);
            }
            None => tracing::warn!(
                exam = exam_id,
                exam_subject = %es.id,
                "exam subject has no standard; skipped"
            ),
        }
    }

    let mut processed = BTreeMap::new();
    for standard_id in standards {
        let students = registry::enrolled_in(conn, &standard_id, &exam.academic_year_id)?;
        let mut count = 0usize;
        for enrollment in &students {
            let tx = conn.unchecked_transaction()?;
            let summary = summary::recompute(&tx, &enrollment.id, exam_id)?;
            tx.commit()?;
            if summary.is_some() {
                count += 1;
            } else {
                tracing::debug!(enrollment = %enrollment.id, "no results; skipped");
            }
        }

        let ranks = rank::run_ranking(conn, exam_id, &standard_id, &exam.academic_year_id)?;
        tracing::info!(
            exam = exam_id,
            standard = %standard_id,
            enrolled = students.len(),
            processed = count,
            ranked = ranks.len(),
            "standard processed"
        );
        processed.insert(standard_id, count);
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EnrollmentStatus;
    use crate::registry::set_enrollment_status;
    use crate::store::record_subject_result;
    use crate::summary::get_summary;
    use crate::test_support::School;
    use rust_decimal_macros::dec;

    #[test]
    fn counts_summaries_per_standard_and_ranks() {
        let school = School::new();
        let other = school.add_standard("Grade 9");
        let math = school.exam_subject("MATH", dec!(75), dec!(25));
        let phy = school.exam_subject_in(&other, "PHY", dec!(75), dec!(25));

        let a = school.enroll("1");
        let b = school.enroll("2");
        let _no_results = school.enroll("3");
        let c = school.enroll_in(&other, "1");

        record_subject_result(&school.conn, &a, &math, dec!(50), dec!(15)).expect("a");
        record_subject_result(&school.conn, &b, &math, dec!(70), dec!(22)).expect("b");
        record_subject_result(&school.conn, &c, &phy, dec!(60), dec!(20)).expect("c");

        let out = run_full_exam_pipeline(&school.conn, &school.exam).expect("pipeline");
        assert_eq!(out.len(), 2);
        assert_eq!(out[&school.standard], 2);
        assert_eq!(out[&other], 1);

        let sb = get_summary(&school.conn, &b, &school.exam).expect("get").expect("b");
        let sa = get_summary(&school.conn, &a, &school.exam).expect("get").expect("a");
        let sc = get_summary(&school.conn, &c, &school.exam).expect("get").expect("c");
        assert_eq!(sb.rank, Some(1));
        assert_eq!(sa.rank, Some(2));
        assert_eq!(sc.rank, Some(1));
    }

    #[test]
    fn repairs_missing_summary() {
        let school = School::new();
        let math = school.exam_subject("MATH", dec!(75), dec!(25));
        let a = school.enroll("1");
        record_subject_result(&school.conn, &a, &math, dec!(50), dec!(15)).expect("a");
        school
            .conn
            .execute("DELETE FROM result_summaries", [])
            .expect("drop summaries");

        let out = run_full_exam_pipeline(&school.conn, &school.exam).expect("pipeline");
        assert_eq!(out[&school.standard], 1);
        let s = get_summary(&school.conn, &a, &school.exam).expect("get").expect("rebuilt");
        assert_eq!(s.total_marks.to_string(), "65.00");
        assert_eq!(s.rank, Some(1));
    }

    #[test]
    fn skips_students_no_longer_enrolled() {
        let school = School::new();
        let math = school.exam_subject("MATH", dec!(75), dec!(25));
        let a = school.enroll("1");
        let b = school.enroll("2");
        record_subject_result(&school.conn, &a, &math, dec!(50), dec!(15)).expect("a");
        record_subject_result(&school.conn, &b, &math, dec!(60), dec!(15)).expect("b");
        set_enrollment_status(&school.conn, &b, EnrollmentStatus::Withdrawn).expect("status");

        let out = run_full_exam_pipeline(&school.conn, &school.exam).expect("pipeline");
        assert_eq!(out[&school.standard], 1);
    }

    #[test]
    fn exam_without_subjects_processes_nothing() {
        let school = School::new();
        school.enroll("1");
        let out = run_full_exam_pipeline(&school.conn, &school.exam).expect("pipeline");
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_exam_is_not_found() {
        let school = School::new();
        let err = run_full_exam_pipeline(&school.conn, "ghost").expect_err("unknown");
        assert_eq!(err.code(), "not_found");
    }
}

use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::db::open_in_memory;
use crate::grading::round2;
use crate::model::{EnrollmentStatus, ExamTerm};
use crate::registry::{self, NewEnrollment, NewExam, NewExamSubject, NewSubject};

/// One academic year, one standard and one exam in an in-memory workspace.
pub struct School {
    pub conn: Connection,
    pub year: String,
    pub standard: String,
    pub exam: String,
}

impl School {
    pub fn new() -> Self {
        let conn = open_in_memory().expect("open db");
        let year = registry::create_academic_year(&conn, "2081", true).expect("year");
        let standard = registry::create_standard(&conn, "Grade 8", Some("A")).expect("standard");
        let exam = registry::create_exam(
            &conn,
            &NewExam {
                name: "First Terminal".into(),
                term: ExamTerm::FirstTerm,
                academic_year_id: year.clone(),
                start_date: None,
                end_date: None,
            },
        )
        .expect("exam");
        School {
            conn,
            year,
            standard,
            exam,
        }
    }

    /// Adds a subject of this standard to the exam. Pass marks are 35% of full.
    pub fn exam_subject(&self, code: &str, full_theory: Decimal, full_practical: Decimal) -> String {
        self.exam_subject_in(&self.standard, code, full_theory, full_practical)
    }

    pub fn exam_subject_in(
        &self,
        standard: &str,
        code: &str,
        full_theory: Decimal,
        full_practical: Decimal,
    ) -> String {
        let subject = registry::create_subject(
            &self.conn,
            &NewSubject {
                name: code.to_string(),
                code: format!("{}-{}", code, &standard[..8]),
                standard_id: standard.to_string(),
                credit_hours: dec!(4),
            },
        )
        .expect("subject");
        registry::create_exam_subject(
            &self.conn,
            &NewExamSubject {
                exam_id: self.exam.clone(),
                subject_id: subject,
                full_marks_theory: Some(full_theory),
                pass_marks_theory: Some(round2(full_theory * dec!(0.35))),
                full_marks_practical: Some(full_practical),
                pass_marks_practical: Some(round2(full_practical * dec!(0.35))),
                ..Default::default()
            },
        )
        .expect("exam subject")
    }

    pub fn enroll(&self, roll: &str) -> String {
        self.enroll_in(&self.standard, roll)
    }

    pub fn enroll_in(&self, standard: &str, roll: &str) -> String {
        let student = registry::create_student(
            &self.conn,
            "Student",
            roll,
            &format!("ADM-{}-{}", &standard[..8], roll),
        )
        .expect("student");
        registry::create_enrollment(
            &self.conn,
            &NewEnrollment {
                student_id: student,
                standard_id: standard.to_string(),
                academic_year_id: self.year.clone(),
                roll_number: roll.to_string(),
                status: EnrollmentStatus::Enrolled,
            },
        )
        .expect("enrollment")
    }

    pub fn add_standard(&self, name: &str) -> String {
        registry::create_standard(&self.conn, name, None).expect("standard")
    }
}

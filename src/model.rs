use rust_decimal::Decimal;
use serde::Serialize;

use crate::grading::Grade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Enrolled,
    DroppedOut,
    Transferred,
    Promoted,
    Failed,
    Graduated,
    Withdrawn,
}

impl EnrollmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "enrolled" => Some(Self::Enrolled),
            "dropped_out" => Some(Self::DroppedOut),
            "transferred" => Some(Self::Transferred),
            "promoted" => Some(Self::Promoted),
            "failed" => Some(Self::Failed),
            "graduated" => Some(Self::Graduated),
            "withdrawn" => Some(Self::Withdrawn),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::DroppedOut => "dropped_out",
            Self::Transferred => "transferred",
            Self::Promoted => "promoted",
            Self::Failed => "failed",
            Self::Graduated => "graduated",
            Self::Withdrawn => "withdrawn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamTerm {
    FirstTerm,
    SecondTerm,
    ThirdTerm,
    FinalTerm,
    UnitTest,
}

impl ExamTerm {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first_term" => Some(Self::FirstTerm),
            "second_term" => Some(Self::SecondTerm),
            "third_term" => Some(Self::ThirdTerm),
            "final_term" => Some(Self::FinalTerm),
            "unit_test" => Some(Self::UnitTest),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstTerm => "first_term",
            Self::SecondTerm => "second_term",
            Self::ThirdTerm => "third_term",
            Self::FinalTerm => "final_term",
            Self::UnitTest => "unit_test",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub student_id: String,
    pub standard_id: String,
    pub academic_year_id: String,
    pub roll_number: String,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub name: String,
    pub term: ExamTerm,
    pub academic_year_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_published: bool,
}

/// Full/pass marks of one subject within one exam.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSubjectSpec {
    pub id: String,
    pub exam_id: String,
    pub subject_id: String,
    pub standard_id: Option<String>,
    pub exam_date: Option<String>,
    pub full_marks_theory: Decimal,
    pub pass_marks_theory: Decimal,
    pub full_marks_practical: Decimal,
    pub pass_marks_practical: Decimal,
}

impl ExamSubjectSpec {
    pub fn total_full_marks(&self) -> Decimal {
        self.full_marks_theory + self.full_marks_practical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub id: String,
    pub student_enrollment_id: String,
    pub exam_subject_id: String,
    pub marks_obtained_theory: Decimal,
    pub marks_obtained_practical: Decimal,
    pub subject_grade: Grade,
    pub subject_grade_point: Decimal,
    pub updated_at: String,
}

impl SubjectResult {
    pub fn total_obtained(&self) -> Decimal {
        self.marks_obtained_theory + self.marks_obtained_practical
    }
}

/// Materialized per-exam view of one student's subject results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResultSummary {
    pub id: String,
    pub student_enrollment_id: String,
    pub exam_id: String,
    pub academic_year_id: String,
    pub total_marks: Decimal,
    pub percentage: Decimal,
    pub gpa: Decimal,
    pub overall_grade: String,
    pub rank: Option<i64>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub student_enrollment_id: String,
    pub rank: i64,
}

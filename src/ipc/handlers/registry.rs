use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{
    db_conn, optional_bool, optional_decimal, optional_str, required_str, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{EnrollmentStatus, ExamTerm};
use crate::registry::{self, NewEnrollment, NewExam, NewExamSubject, NewSubject};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn created(req: &Request, id: String) -> Value {
    ok(&req.id, json!({ "id": id }))
}

fn parse_status(req: &Request, raw: &str) -> HandlerResult<EnrollmentStatus> {
    EnrollmentStatus::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("unknown enrollment status: {}", raw),
            None,
        )
    })
}

fn handle_academic_years_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let name = required_str(req, "name")?;
    let is_current = optional_bool(req, "isCurrent")?.unwrap_or(false);
    registry::create_academic_year(conn, name, is_current)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_standards_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let name = required_str(req, "name")?;
    let section = optional_str(req, "section")?;
    registry::create_standard(conn, name, section)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let subject = NewSubject {
        name: required_str(req, "name")?.to_string(),
        code: required_str(req, "code")?.to_string(),
        standard_id: required_str(req, "standardId")?.to_string(),
        credit_hours: optional_decimal(req, "creditHours")?.unwrap_or(Decimal::ZERO),
    };
    registry::create_subject(conn, &subject)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let first_name = required_str(req, "firstName")?;
    let last_name = required_str(req, "lastName")?;
    let admission_number = required_str(req, "admissionNumber")?;
    registry::create_student(conn, first_name, last_name, admission_number)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_enrollments_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let status = match optional_str(req, "status")? {
        Some(raw) => parse_status(req, raw)?,
        None => EnrollmentStatus::Enrolled,
    };
    let enrollment = NewEnrollment {
        student_id: required_str(req, "studentId")?.to_string(),
        standard_id: required_str(req, "standardId")?.to_string(),
        academic_year_id: required_str(req, "academicYearId")?.to_string(),
        roll_number: required_str(req, "rollNumber")?.to_string(),
        status,
    };
    registry::create_enrollment(conn, &enrollment)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_enrollments_set_status(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let status = parse_status(req, required_str(req, "status")?)?;
    registry::set_enrollment_status(conn, enrollment_id, status)
        .map(|_| ok(&req.id, json!({ "ok": true })))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_exams_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let term_raw = required_str(req, "term")?;
    let Some(term) = ExamTerm::parse(term_raw) else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("unknown exam term: {}", term_raw),
            None,
        ));
    };
    let exam = NewExam {
        name: required_str(req, "name")?.to_string(),
        term,
        academic_year_id: required_str(req, "academicYearId")?.to_string(),
        start_date: optional_str(req, "startDate")?.map(str::to_string),
        end_date: optional_str(req, "endDate")?.map(str::to_string),
    };
    registry::create_exam(conn, &exam)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_exams_set_published(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let exam_id = required_str(req, "examId")?;
    let Some(published) = optional_bool(req, "published")? else {
        return Err(err(&req.id, "bad_params", "missing published", None));
    };
    registry::set_exam_published(conn, exam_id, published)
        .map(|_| ok(&req.id, json!({ "ok": true })))
        .map_err(|e| engine_err(&req.id, e))
}

fn handle_exam_subjects_create(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let es = NewExamSubject {
        exam_id: required_str(req, "examId")?.to_string(),
        subject_id: required_str(req, "subjectId")?.to_string(),
        exam_date: optional_str(req, "examDate")?.map(str::to_string),
        full_marks_theory: optional_decimal(req, "fullMarksTheory")?,
        pass_marks_theory: optional_decimal(req, "passMarksTheory")?,
        full_marks_practical: optional_decimal(req, "fullMarksPractical")?,
        pass_marks_practical: optional_decimal(req, "passMarksPractical")?,
    };
    registry::create_exam_subject(conn, &es)
        .map(|id| created(req, id))
        .map_err(|e| engine_err(&req.id, e))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "academicYears.create" => handle_academic_years_create(state, req),
        "standards.create" => handle_standards_create(state, req),
        "subjects.create" => handle_subjects_create(state, req),
        "students.create" => handle_students_create(state, req),
        "enrollments.create" => handle_enrollments_create(state, req),
        "enrollments.setStatus" => handle_enrollments_set_status(state, req),
        "exams.create" => handle_exams_create(state, req),
        "exams.setPublished" => handle_exams_set_published(state, req),
        "examSubjects.create" => handle_exam_subjects_create(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e))
}

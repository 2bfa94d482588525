#![allow(dead_code)]

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    pub child: Child,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_sidecar() -> (Sidecar, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultsd");
    let mut child = Command::new(exe)
        .env_remove("RESULTSD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (Sidecar { child }, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(Value::Null)
}

/// Returns the error code of a failed response.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value["error"]["code"]
        .as_str()
        .expect("error code")
        .to_string()
}

pub fn created_id(result: &Value) -> String {
    result
        .get("id")
        .and_then(|v| v.as_str())
        .expect("created id")
        .to_string()
}

/// One year, one standard and one exam with a MATH (75/25) and SCI (75/25)
/// paper, created over IPC.
pub struct Seed {
    pub year: String,
    pub standard: String,
    pub exam: String,
    pub math: String,
    pub science: String,
}

pub fn seed_school(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Seed {
    let year = created_id(&request_ok(
        stdin,
        reader,
        "seed-year",
        "academicYears.create",
        json!({ "name": "2081", "isCurrent": true }),
    ));
    let standard = created_id(&request_ok(
        stdin,
        reader,
        "seed-standard",
        "standards.create",
        json!({ "name": "Grade 8", "section": "A" }),
    ));
    let exam = created_id(&request_ok(
        stdin,
        reader,
        "seed-exam",
        "exams.create",
        json!({ "name": "First Terminal", "term": "first_term", "academicYearId": year }),
    ));
    let mut papers = Vec::new();
    for code in ["MATH", "SCI"] {
        let subject = created_id(&request_ok(
            stdin,
            reader,
            &format!("seed-subject-{}", code),
            "subjects.create",
            json!({ "name": code, "code": code, "standardId": standard, "creditHours": 4 }),
        ));
        papers.push(created_id(&request_ok(
            stdin,
            reader,
            &format!("seed-paper-{}", code),
            "examSubjects.create",
            json!({
                "examId": exam,
                "subjectId": subject,
                "fullMarksTheory": "75",
                "passMarksTheory": "27",
                "fullMarksPractical": "25",
                "passMarksPractical": "9"
            }),
        )));
    }
    let science = papers.pop().expect("science");
    let math = papers.pop().expect("math");
    Seed {
        year,
        standard,
        exam,
        math,
        science,
    }
}

pub fn enroll(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    seed: &Seed,
    roll: &str,
) -> String {
    let student = created_id(&request_ok(
        stdin,
        reader,
        &format!("student-{}", roll),
        "students.create",
        json!({ "firstName": "Student", "lastName": roll, "admissionNumber": format!("ADM-{}", roll) }),
    ));
    created_id(&request_ok(
        stdin,
        reader,
        &format!("enroll-{}", roll),
        "enrollments.create",
        json!({
            "studentId": student,
            "standardId": seed.standard,
            "academicYearId": seed.year,
            "rollNumber": roll
        }),
    ))
}

mod test_support;

use serde_json::json;
use test_support::{enroll, request_ok, seed_school, spawn_sidecar, temp_dir};

#[test]
fn record_summarize_rank_and_delete_over_ipc() {
    let workspace = temp_dir("resultsd-pipeline-ipc");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seed = seed_school(&mut stdin, &mut reader);
    let asha = enroll(&mut stdin, &mut reader, &seed, "1");
    let bikash = enroll(&mut stdin, &mut reader, &seed, "2");

    let recorded = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "results.record",
        json!({ "enrollmentId": asha, "examSubjectId": seed.math, "theory": 70, "practical": "20" }),
    );
    assert_eq!(recorded["result"]["subjectGrade"], "A+");
    assert_eq!(recorded["result"]["subjectGradePoint"], "4.00");
    assert_eq!(recorded["result"]["marksObtainedTheory"], "70.00");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "results.record",
        json!({ "enrollmentId": asha, "examSubjectId": seed.science, "theory": "55", "practical": "20" }),
    );
    // Theory 20/75 is below 35%: NG regardless of practical.
    let ng = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "results.record",
        json!({ "enrollmentId": bikash, "examSubjectId": seed.math, "theory": "20", "practical": "25" }),
    );
    assert_eq!(ng["result"]["subjectGrade"], "NG");

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "summary.get",
        json!({ "enrollmentId": asha, "examId": seed.exam }),
    );
    let s = &summary["summary"];
    assert_eq!(s["totalMarks"], "165.00");
    assert_eq!(s["percentage"], "82.50");
    assert_eq!(s["gpa"], "3.60");
    assert_eq!(s["overallGrade"], "PASS");
    assert!(s["rank"].is_null());

    let b_summary = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "summary.get",
        json!({ "enrollmentId": bikash, "examId": seed.exam }),
    );
    assert_eq!(b_summary["summary"]["overallGrade"], "NG");
    assert_eq!(b_summary["summary"]["gpa"], "0.00");

    let pipeline = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "pipeline.runExam",
        json!({ "examId": seed.exam }),
    );
    assert_eq!(pipeline["processed"][&seed.standard], 2);

    let sheet = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "marksheet.get",
        json!({ "enrollmentId": asha, "examId": seed.exam }),
    );
    let m = &sheet["marksheet"];
    assert_eq!(m["rank"], 1);
    assert_eq!(m["studentFullName"], "Student 1");
    assert_eq!(m["standard"], "Grade 8 A");
    assert_eq!(m["isPublished"], false);
    assert_eq!(m["subjects"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(m["subjects"][0]["subjectName"], "MATH");

    let list = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "results.list",
        json!({ "enrollmentId": bikash, "examId": seed.exam }),
    );
    assert_eq!(list["results"].as_array().map(|a| a.len()), Some(1));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "results.remove",
        json!({ "enrollmentId": bikash, "examSubjectId": seed.math }),
    );
    assert_eq!(removed["removed"], true);
    let gone = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "summary.get",
        json!({ "enrollmentId": bikash, "examId": seed.exam }),
    );
    assert!(gone["summary"].is_null());

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "results.remove",
        json!({ "enrollmentId": bikash, "examSubjectId": seed.math }),
    );
    assert_eq!(again["removed"], false);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn summary_recompute_is_idempotent_over_ipc() {
    let workspace = temp_dir("resultsd-recompute-ipc");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seed = seed_school(&mut stdin, &mut reader);
    let kid = enroll(&mut stdin, &mut reader, &seed, "7");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "results.record",
        json!({ "enrollmentId": kid, "examSubjectId": seed.math, "theory": "61.5", "practical": "19" }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "summary.recompute",
        json!({ "enrollmentId": kid, "examId": seed.exam }),
    );
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "summary.recompute",
        json!({ "enrollmentId": kid, "examId": seed.exam }),
    );
    assert_eq!(first, second);
    assert_eq!(first["summary"]["totalMarks"], "80.50");

    let _ = std::fs::remove_dir_all(workspace);
}

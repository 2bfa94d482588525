mod test_support;

use serde_json::json;
use std::process::Command;
use test_support::{enroll, request_ok, seed_school, spawn_sidecar, temp_dir};

#[test]
fn pipeline_subcommand_reports_counts_per_standard() {
    let workspace = temp_dir("resultsd-cli-pipeline");
    let seed = {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let seed = seed_school(&mut stdin, &mut reader);
        let a = enroll(&mut stdin, &mut reader, &seed, "1");
        let _b = enroll(&mut stdin, &mut reader, &seed, "2");
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "results.record",
            json!({ "enrollmentId": a, "examSubjectId": seed.math, "theory": "40", "practical": "10" }),
        );
        seed
    };

    let out = Command::new(env!("CARGO_BIN_EXE_resultsd"))
        .args(["--workspace"])
        .arg(&workspace)
        .args(["pipeline", "--exam", &seed.exam])
        .output()
        .expect("run resultsd pipeline");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("pipeline report json");
    assert_eq!(report["examId"], seed.exam.as_str());
    assert_eq!(report["processed"][&seed.standard], 1);

    let missing = Command::new(env!("CARGO_BIN_EXE_resultsd"))
        .args(["--workspace"])
        .arg(&workspace)
        .args(["pipeline", "--exam", "ghost"])
        .output()
        .expect("run resultsd pipeline");
    assert!(!missing.status.success());

    let _ = std::fs::remove_dir_all(workspace);
}

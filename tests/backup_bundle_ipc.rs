mod test_support;

use serde_json::json;
use test_support::{enroll, request_err, request_ok, seed_school, spawn_sidecar, temp_dir};

#[test]
fn exported_bundle_restores_results_into_new_workspace() {
    let workspace = temp_dir("resultsd-backup-src");
    let restored = temp_dir("resultsd-backup-dst");
    let out_dir = temp_dir("resultsd-backup-out");
    let bundle = out_dir.join("workspace.resultsd.zip");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let seed = seed_school(&mut stdin, &mut reader);
    let kid = enroll(&mut stdin, &mut reader, &seed, "1");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "results.record",
        json!({ "enrollmentId": kid, "examSubjectId": seed.math, "theory": "70", "practical": "20" }),
    );

    let export = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["bundleFormat"], "resultsd-workspace-v1");
    assert_eq!(export["entryCount"], 2);
    assert_eq!(export["dbSha256"].as_str().map(|s| s.len()), Some(64));

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy(), "workspacePath": restored.to_string_lossy() }),
    );
    assert_eq!(import["dbSha256"], export["dbSha256"]);

    let health = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert_eq!(health["workspacePath"], &*restored.to_string_lossy());

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "summary.get",
        json!({ "enrollmentId": kid, "examId": seed.exam }),
    );
    assert_eq!(summary["summary"]["totalMarks"], "90.00");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "backup.importWorkspaceBundle",
        json!({ "inPath": out_dir.join("missing.zip").to_string_lossy() }),
    );
    assert_eq!(code, "not_found");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(restored);
    let _ = std::fs::remove_dir_all(out_dir);
}

use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{db_conn, required_decimal, required_str, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::{json, Value};

fn handle_results_record(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_subject_id = required_str(req, "examSubjectId")?;
    let theory = required_decimal(req, "theory")?;
    let practical = required_decimal(req, "practical")?;

    let result =
        store::record_subject_result(conn, enrollment_id, exam_subject_id, theory, practical)
            .map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "result": result })))
}

fn handle_results_remove(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_subject_id = required_str(req, "examSubjectId")?;

    let removed = store::remove_subject_result(conn, enrollment_id, exam_subject_id)
        .map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "removed": removed })))
}

fn handle_results_list(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_id = required_str(req, "examId")?;

    let rows = store::list_for(conn, enrollment_id, exam_id).map_err(|e| engine_err(&req.id, e))?;
    let results: Vec<_> = rows.into_iter().map(|r| r.result).collect();
    Ok(ok(&req.id, json!({ "results": results })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "results.record" => handle_results_record(state, req),
        "results.remove" => handle_results_remove(state, req),
        "results.list" => handle_results_list(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e))
}

use crate::error::EngineResult;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{db_conn, required_str, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::marksheet;
use crate::summary;
use serde_json::{json, Value};

fn handle_summary_get(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_id = required_str(req, "examId")?;
    let s = summary::get_summary(conn, enrollment_id, exam_id).map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "summary": s })))
}

fn handle_summary_recompute(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_id = required_str(req, "examId")?;

    let run = || -> EngineResult<_> {
        let tx = conn.unchecked_transaction()?;
        let s = summary::recompute(&tx, enrollment_id, exam_id)?;
        tx.commit()?;
        Ok(s)
    };
    let s = run().map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "summary": s })))
}

fn handle_marksheet_get(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let enrollment_id = required_str(req, "enrollmentId")?;
    let exam_id = required_str(req, "examId")?;
    let sheet = marksheet::build_marksheet(conn, enrollment_id, exam_id)
        .map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "marksheet": sheet })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "summary.get" => handle_summary_get(state, req),
        "summary.recompute" => handle_summary_recompute(state, req),
        "marksheet.get" => handle_marksheet_get(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e))
}

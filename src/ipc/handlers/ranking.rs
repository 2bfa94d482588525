use crate::ipc::error::{engine_err, ok};
use crate::ipc::helpers::{db_conn, required_str, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::pipeline;
use crate::rank;
use serde_json::{json, Value};

fn handle_ranking_run(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let exam_id = required_str(req, "examId")?;
    let standard_id = required_str(req, "standardId")?;
    let academic_year_id = required_str(req, "academicYearId")?;

    let ranks = rank::run_ranking(conn, exam_id, standard_id, academic_year_id)
        .map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "ranks": ranks })))
}

fn handle_pipeline_run_exam(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let exam_id = required_str(req, "examId")?;

    let processed = pipeline::run_full_exam_pipeline(conn, exam_id)
        .map_err(|e| engine_err(&req.id, e))?;
    Ok(ok(&req.id, json!({ "examId": exam_id, "processed": processed })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "ranking.run" => handle_ranking_run(state, req),
        "pipeline.runExam" => handle_pipeline_run_exam(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e))
}

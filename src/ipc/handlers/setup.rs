use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::helpers::{db_conn, required_str, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, SetupSection};
use serde_json::{Map, Value};

fn handle_setup_get(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let mut out = Map::new();
    for section in SetupSection::ALL {
        let v = settings::load_section(conn, section).map_err(|e| engine_err(&req.id, e))?;
        out.insert(section.name().to_string(), v);
    }
    Ok(ok(&req.id, Value::Object(out)))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> HandlerResult<Value> {
    let conn = db_conn(state, req)?;
    let section_raw = required_str(req, "section")?;
    let Some(section) = SetupSection::parse(section_raw) else {
        return Err(err(&req.id, "bad_params", "unknown section", None));
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(err(&req.id, "bad_params", "patch must be an object", None));
    };

    match settings::update_section(conn, section, patch_obj) {
        Ok(Ok(current)) => Ok(ok(&req.id, current)),
        Ok(Err(msg)) => Err(err(&req.id, "bad_params", msg, None)),
        Err(e) => Err(engine_err(&req.id, e)),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e))
}

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

/// Error response ready to send back.
pub type HandlerResult<T> = Result<T, Value>;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> HandlerResult<&'a Connection> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str<'a>(req: &'a Request, key: &str) -> HandlerResult<&'a str> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> HandlerResult<Option<&'a str>> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string", key),
            None,
        )),
    }
}

pub fn optional_bool(req: &Request, key: &str) -> HandlerResult<Option<bool>> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a boolean", key),
            None,
        )),
    }
}

/// Marks travel as JSON strings ("26.25") or numbers; numbers are read through
/// their decimal text so no binary float rounding leaks in.
pub fn optional_decimal(req: &Request, key: &str) -> HandlerResult<Option<Decimal>> {
    let bad = || {
        err(
            &req.id,
            "bad_params",
            format!("{} must be a decimal number", key),
            None,
        )
    };
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).map(Some).map_err(|_| bad()),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map(Some)
            .map_err(|_| bad()),
        Some(_) => Err(bad()),
    }
}

pub fn required_decimal(req: &Request, key: &str) -> HandlerResult<Decimal> {
    optional_decimal(req, key)?
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(params: Value) -> Request {
        Request {
            id: "1".into(),
            method: "t".into(),
            params,
        }
    }

    #[test]
    fn decimals_accept_strings_and_numbers() {
        let r = req(json!({ "a": "26.25", "b": 70, "c": 19.5, "d": true }));
        assert_eq!(required_decimal(&r, "a").expect("a").to_string(), "26.25");
        assert_eq!(required_decimal(&r, "b").expect("b").to_string(), "70");
        assert_eq!(required_decimal(&r, "c").expect("c").to_string(), "19.5");
        let e = required_decimal(&r, "d").expect_err("bool");
        assert_eq!(e["error"]["code"], "bad_params");
        let e = required_decimal(&r, "missing").expect_err("missing");
        assert_eq!(e["error"]["message"], "missing missing");
    }

    #[test]
    fn required_str_rejects_blank() {
        let r = req(json!({ "examId": "  " }));
        assert!(required_str(&r, "examId").is_err());
    }
}

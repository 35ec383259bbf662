use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::portal::Portal;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> String {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Roll numbers may arrive as JSON numbers; they are matched as text.
pub fn roll_number(req: &Request) -> Result<String, serde_json::Value> {
    match req.params.get("rollNumber") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(err(&req.id, "bad_params", "missing rollNumber", None)),
    }
}

pub fn portal<'a>(state: &'a AppState, req: &Request) -> Result<&'a Portal, serde_json::Value> {
    state
        .portal
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

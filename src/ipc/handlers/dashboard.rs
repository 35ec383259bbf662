use crate::ipc::error::{ok, portal_err};
use crate::ipc::helpers::portal;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_stats(state: &AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let stats = portal.dashboard().map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(&req.id, json!(stats)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.stats" => Some(handle_stats(state, req).unwrap_or_else(|e| e)),
        _ => None,
    }
}

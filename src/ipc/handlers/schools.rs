use crate::ipc::error::{ok, portal_err};
use crate::ipc::helpers::{optional_str, portal, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_list(state: &AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let schools = portal.schools().map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "schools": schools })))
}

fn handle_register(
    state: &AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let school_id = required_str(req, "schoolId")?;
    let name = required_str(req, "name")?;
    let email = optional_str(req, "email");
    let school = portal
        .register(&school_id, &name, &email)
        .map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "school": school })))
}

fn handle_delete(state: &AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let school_id = required_str(req, "schoolId")?;
    let removed = portal
        .delete(&school_id)
        .map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "removed": removed })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "schools.list" => handle_list(state, req),
        "schools.register" => handle_register(state, req),
        "schools.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}

use crate::ipc::error::{err, ok, portal_err};
use crate::ipc::helpers::{portal, required_str, roll_number};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_upload(state: &AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let school_id = required_str(req, "schoolId")?;
    let academic_year = required_str(req, "academicYear")?;
    let term = required_str(req, "term")?;
    let file_path = PathBuf::from(required_str(req, "filePath")?);

    let bytes = std::fs::read(&file_path).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            format!("failed to read {}: {}", file_path.to_string_lossy(), e),
            None,
        )
    })?;
    let summary = portal
        .upload(&school_id, &academic_year, &term, &bytes)
        .map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(
        &req.id,
        json!({
            "studentCount": summary.student_count,
            "message": summary.message(),
            "path": summary.path.to_string_lossy(),
        }),
    ))
}

fn handle_lookup(state: &AppState, req: &Request) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let school_id = required_str(req, "schoolId")?;
    let academic_year = required_str(req, "academicYear")?;
    let roll = roll_number(req)?;
    let card = portal
        .lookup(&school_id, &academic_year, &roll)
        .map_err(|e| portal_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "report": card })))
}

fn handle_export_pdf(
    state: &AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let portal = portal(state, req)?;
    let school_id = required_str(req, "schoolId")?;
    let academic_year = required_str(req, "academicYear")?;
    let roll = roll_number(req)?;
    let out_path = PathBuf::from(required_str(req, "outPath")?);

    let (file_name, bytes) = portal
        .report_pdf(&school_id, &academic_year, &roll)
        .map_err(|e| portal_err(&req.id, &e))?;
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                err(
                    &req.id,
                    "io_failed",
                    format!("failed to create {}: {}", parent.to_string_lossy(), e),
                    None,
                )
            })?;
        }
    }
    std::fs::write(&out_path, &bytes).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            format!("failed to write {}: {}", out_path.to_string_lossy(), e),
            None,
        )
    })?;
    Ok(ok(
        &req.id,
        json!({
            "fileName": file_name,
            "outPath": out_path.to_string_lossy(),
            "bytes": bytes.len(),
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "results.upload" => handle_upload(state, req),
        "results.lookup" => handle_lookup(state, req),
        "results.exportPdf" => handle_export_pdf(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}

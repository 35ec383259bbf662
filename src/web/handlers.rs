use super::pages::{self, Flash};
use super::WebState;
use crate::error::PortalError;
use crate::portal::Portal;
use anyhow::anyhow;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

/// Runs filesystem-bound portal work on the blocking pool.
async fn blocking<T, F>(state: &WebState, f: F) -> Result<T, PortalError>
where
    F: FnOnce(&Portal) -> Result<T, PortalError> + Send + 'static,
    T: Send + 'static,
{
    let portal = state.portal.clone();
    tokio::task::spawn_blocking(move || f(&portal))
        .await
        .map_err(|e| PortalError::Io(anyhow!("worker task failed: {}", e)))?
}

async fn schools_or_empty(state: &WebState) -> Vec<crate::store::School> {
    match blocking(state, |p| p.schools()).await {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "failed to load school registry");
            Vec::new()
        }
    }
}

async fn admin_page(state: &WebState, flash: Flash) -> Html<String> {
    let schools = schools_or_empty(state).await;
    Html(pages::school_admin(&state.config, &schools, Some(&flash)))
}

pub async fn index(State(state): State<WebState>) -> Html<String> {
    let schools = schools_or_empty(&state).await;
    Html(pages::index(&state.config, &schools))
}

pub async fn school_admin(State(state): State<WebState>) -> Html<String> {
    let schools = schools_or_empty(&state).await;
    Html(pages::school_admin(&state.config, &schools, None))
}

pub async fn student_login(State(state): State<WebState>) -> Html<String> {
    let schools = schools_or_empty(&state).await;
    Html(pages::student_login(&state.config, &schools, None))
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub school_name: String,
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub contact_email: String,
}

pub async fn register_school(
    State(state): State<WebState>,
    Form(form): Form<RegisterForm>,
) -> Html<String> {
    let name = form.school_name.clone();
    let outcome = blocking(&state, move |p| {
        p.register(&form.school_id, &form.school_name, &form.contact_email)
    })
    .await;
    let flash = match outcome {
        Ok(_) => Flash::success(format!("School '{}' registered successfully!", name)),
        Err(e) => Flash::error(e.to_string()),
    };
    admin_page(&state, flash).await
}

#[derive(Debug, Default)]
struct UploadForm {
    school_id: String,
    academic_year: String,
    term: String,
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "excel_file" => {
                form.file_name = field.file_name().unwrap_or("").to_string();
                form.bytes = field.bytes().await.map_err(|e| e.to_string())?.to_vec();
            }
            "school_id" => form.school_id = field.text().await.map_err(|e| e.to_string())?,
            "academic_year" => {
                form.academic_year = field.text().await.map_err(|e| e.to_string())?
            }
            "term" => form.term = field.text().await.map_err(|e| e.to_string())?,
            _ => {}
        }
    }
    Ok(form)
}

pub async fn upload_results(State(state): State<WebState>, multipart: Multipart) -> Html<String> {
    let form = match read_upload(multipart).await {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "malformed upload");
            return admin_page(&state, Flash::error(format!("Error uploading file: {}", e))).await;
        }
    };
    if form.file_name.is_empty() || form.bytes.is_empty() {
        return admin_page(&state, Flash::error(PortalError::NoFile.to_string())).await;
    }

    let outcome = blocking(&state, move |p| {
        p.upload(&form.school_id, &form.academic_year, &form.term, &form.bytes)
    })
    .await;
    let flash = match outcome {
        Ok(summary) => Flash::success(summary.message()),
        Err(e @ PortalError::Io(_)) => Flash::error(format!("Error uploading file: {}", e)),
        Err(e) => Flash::error(e.to_string()),
    };
    admin_page(&state, flash).await
}

#[derive(Debug, Deserialize)]
pub struct LookupForm {
    #[serde(default)]
    pub school_id: String,
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub roll_number: String,
}

pub async fn student_result(
    State(state): State<WebState>,
    Form(form): Form<LookupForm>,
) -> Html<String> {
    let outcome = blocking(&state, move |p| {
        p.lookup(&form.school_id, &form.academic_year, &form.roll_number)
    })
    .await;
    match outcome {
        Ok(card) => Html(pages::student_result(&card)),
        Err(e) => {
            let message = match e {
                PortalError::Io(_) => format!("Error processing result: {}", e),
                _ => e.to_string(),
            };
            let schools = schools_or_empty(&state).await;
            Html(pages::student_login(&state.config, &schools, Some(&message)))
        }
    }
}

pub async fn download_result_pdf(
    State(state): State<WebState>,
    Form(form): Form<LookupForm>,
) -> Response {
    let outcome = blocking(&state, move |p| {
        p.report_pdf(&form.school_id, &form.academic_year, &form.roll_number)
    })
    .await;
    match outcome {
        Ok((file_name, bytes)) => (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(PortalError::RollNotFound) => {
            (StatusCode::NOT_FOUND, "Student data not found").into_response()
        }
        Err(e) => {
            error!(error = %e, "pdf generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating PDF: {}", e),
            )
                .into_response()
        }
    }
}

pub async fn delete_school(
    State(state): State<WebState>,
    Path(school_id): Path<String>,
) -> Response {
    match blocking(&state, move |p| p.delete(&school_id)).await {
        Ok(_) => Redirect::to("/school_admin").into_response(),
        Err(e) => {
            error!(error = %e, "school delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error deleting school: {}", e),
            )
                .into_response()
        }
    }
}

pub async fn admin_dashboard(State(state): State<WebState>) -> Response {
    match blocking(&state, |p| p.dashboard()).await {
        Ok(stats) => Html(pages::admin_dashboard(&state.config, &stats)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn health(State(state): State<WebState>) -> Json<serde_json::Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "dataDir": state.portal.store().root().to_string_lossy(),
    }))
}

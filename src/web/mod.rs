//! HTTP surface: server-rendered pages, form posts, and the PDF download.

mod handlers;
pub mod pages;

use crate::config::{Config, PortalConfig};
use crate::portal::Portal;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct WebState {
    pub portal: Arc<Portal>,
    pub config: Arc<PortalConfig>,
}

pub fn router(state: WebState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/school_admin", get(handlers::school_admin))
        .route("/student_login", get(handlers::student_login))
        .route("/register_school", post(handlers::register_school))
        .route("/upload_results", post(handlers::upload_results))
        .route("/student_result", post(handlers::student_result))
        .route("/download_result_pdf", post(handlers::download_result_pdf))
        .route("/delete_school/{school_id}", get(handlers::delete_school))
        .route("/admin_dashboard", get(handlers::admin_dashboard))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config, portal: Portal) -> anyhow::Result<()> {
    let state = WebState {
        portal: Arc::new(portal),
        config: Arc::new(config.portal.clone()),
    };
    let app = router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %listener.local_addr()?, "result portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::fixtures::term_workbook;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> (tempfile::TempDir, Arc<Portal>, Router) {
        let dir = tempfile::tempdir().expect("tempdir");
        let portal = Arc::new(Portal::open(dir.path()).expect("open portal"));
        let state = WebState {
            portal: portal.clone(),
            config: Arc::new(PortalConfig::default()),
        };
        (dir, portal, router(state, 1024 * 1024))
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn seed_results(portal: &Portal) {
        portal.register("S1", "Green Valley", "").expect("register");
        let t1 = term_workbook(
            &["Math", "English", "Hindi"],
            &[(101, "Asha", "UKG", &[18.0, 16.0, 14.0])],
        );
        let t2 = term_workbook(
            &["Math", "English", "Hindi"],
            &[(101, "Asha", "UKG", &[20.0, 12.0, 0.0])],
        );
        portal.upload("S1", "2024-25", "1st_term", &t1).expect("upload t1");
        portal.upload("S1", "2024-25", "2nd_term", &t2).expect("upload t2");
    }

    #[tokio::test]
    async fn home_lists_registered_schools() {
        let (_dir, portal, app) = app();
        portal.register("DPS001", "Delhi Public", "").expect("register");
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Delhi Public"));
        assert!(html.contains("ID: DPS001 | Students: 0"));
    }

    #[tokio::test]
    async fn register_then_duplicate_shows_messages() {
        let (_dir, _portal, app) = app();
        let ok = app
            .clone()
            .oneshot(form(
                "/register_school",
                "school_name=Green+Valley&school_id=S1&contact_email=gv%40example.com",
            ))
            .await
            .expect("response");
        assert!(body_text(ok)
            .await
            .contains("School &#x27;Green Valley&#x27; registered successfully!"));

        let dup = app
            .oneshot(form(
                "/register_school",
                "school_name=Other&school_id=S1&contact_email=",
            ))
            .await
            .expect("response");
        assert!(body_text(dup).await.contains("School ID already exists!"));
    }

    #[tokio::test]
    async fn multipart_upload_stores_term_file() {
        let (_dir, portal, app) = app();
        portal.register("S1", "Green Valley", "").expect("register");
        let xlsx = term_workbook(&["Math"], &[(1, "A", "I", &[10.0]), (2, "B", "I", &[11.0])]);

        let boundary = "resultdboundary";
        let mut body = Vec::new();
        for (name, value) in [
            ("school_id", "S1"),
            ("academic_year", "2024-25"),
            ("term", "1st_term"),
        ] {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    boundary, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"excel_file\"; filename=\"t1.xlsx\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                boundary
            )
            .as_bytes(),
        );
        body.extend_from_slice(&xlsx);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/upload_results")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .expect("request");
        let resp = app.oneshot(req).await.expect("response");
        let html = body_text(resp).await;
        assert!(html.contains("Results uploaded successfully! Students: 2"));
        assert!(portal
            .store()
            .term_path("S1", "2024-25", crate::store::Term::First)
            .is_file());
        assert_eq!(portal.schools().expect("schools")[0].student_count, 2);
    }

    #[tokio::test]
    async fn student_result_renders_percentages() {
        let (_dir, portal, app) = app();
        seed_results(&portal);
        let resp = app
            .oneshot(form(
                "/student_result",
                "school_id=S1&academic_year=2024-25&roll_number=101",
            ))
            .await
            .expect("response");
        let html = body_text(resp).await;
        assert!(html.contains("Asha"));
        assert!(html.contains("Green Valley - 2024-25"));
        // 48/60, 32/60, 80/120
        assert!(html.contains("<strong>80%</strong>"));
        assert!(html.contains("<strong>53.33%</strong>"));
        assert!(html.contains("<strong>66.67%</strong>"));
    }

    #[tokio::test]
    async fn student_result_reports_missing_data() {
        let (_dir, portal, app) = app();
        let resp = app
            .clone()
            .oneshot(form(
                "/student_result",
                "school_id=S1&academic_year=2024-25&roll_number=1",
            ))
            .await
            .expect("response");
        assert!(body_text(resp)
            .await
            .contains("Result data not available for selected school and year"));

        seed_results(&portal);
        let resp = app
            .oneshot(form(
                "/student_result",
                "school_id=S1&academic_year=2024-25&roll_number=999",
            ))
            .await
            .expect("response");
        assert!(body_text(resp).await.contains("Roll number not found"));
    }

    #[tokio::test]
    async fn pdf_download_and_not_found() {
        let (_dir, portal, app) = app();
        seed_results(&portal);
        let resp = app
            .clone()
            .oneshot(form(
                "/download_result_pdf",
                "school_id=S1&academic_year=2024-25&roll_number=101",
            ))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/pdf")
        );
        assert_eq!(
            resp.headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
            Some("attachment; filename=\"ReportCard_S1_101_2024-25.pdf\"")
        );
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        assert!(bytes.starts_with(b"%PDF"));

        let missing = app
            .oneshot(form(
                "/download_result_pdf",
                "school_id=S1&academic_year=2024-25&roll_number=5",
            ))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(missing).await, "Student data not found");
    }

    #[tokio::test]
    async fn delete_redirects_and_removes_data() {
        let (_dir, portal, app) = app();
        seed_results(&portal);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/delete_school/S1")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/school_admin")
        );
        assert!(!portal.store().school_dir("S1").exists());
        assert!(portal.schools().expect("schools").is_empty());
    }

    #[tokio::test]
    async fn delete_link_targets_only_its_own_school() {
        let (_dir, portal, app) = app();
        portal.register("S", "Plain", "").expect("register S");
        portal.register("S?x", "Query", "").expect("register S?x");

        let html = pages::school_admin(
            &PortalConfig::default(),
            &portal.schools().expect("schools"),
            None,
        );
        let hrefs: Vec<&str> = html
            .split(r#"href=""#)
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .filter(|href| href.starts_with("/delete_school/"))
            .collect();
        assert_eq!(hrefs, vec!["/delete_school/S", "/delete_school/S%3Fx"]);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(hrefs[1])
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let remaining: Vec<String> = portal
            .schools()
            .expect("schools")
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(remaining, vec!["S"]);
    }

    #[tokio::test]
    async fn dashboard_shows_totals() {
        let (_dir, portal, app) = app();
        seed_results(&portal);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/admin_dashboard")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let html = body_text(resp).await;
        assert!(html.contains(r#"<div class="stat-number">1</div><div>Total Schools</div>"#));
        assert!(html.contains(r#"<div class="stat-number">1</div><div>Total Students</div>"#));
    }
}

use crate::error::{PortalError, Result};
use crate::report::{self, ReportCard};
use crate::store::{is_safe_component, School, SchoolStore, Term};
use crate::{pdf, xlsx};
use anyhow::anyhow;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

const RECENT_SCHOOLS: usize = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub school_id: String,
    pub academic_year: String,
    pub term: String,
    pub student_count: usize,
    pub path: PathBuf,
}

impl UploadSummary {
    pub fn message(&self) -> String {
        format!(
            "Results uploaded successfully! Students: {}",
            self.student_count
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_schools: usize,
    pub total_students: usize,
    pub active_years: usize,
    pub recent_schools: Vec<School>,
}

/// Service shared by the HTTP and stdio surfaces. Mutations are serialized
/// through one write lock; lookups read without locking.
#[derive(Debug)]
pub struct Portal {
    store: SchoolStore,
    write_lock: Mutex<()>,
}

impl Portal {
    pub fn open(root: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            store: SchoolStore::open(root)?,
            write_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &SchoolStore {
        &self.store
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| PortalError::Io(anyhow!("portal write lock poisoned")))
    }

    pub fn schools(&self) -> Result<Vec<School>> {
        Ok(self.store.load()?)
    }

    pub fn register(&self, school_id: &str, name: &str, email: &str) -> Result<School> {
        if school_id.is_empty() || name.trim().is_empty() {
            return Err(PortalError::BadParams(
                "School name and ID are required".to_string(),
            ));
        }
        if !is_safe_component(school_id) {
            return Err(PortalError::BadParams(format!(
                "School ID may not contain path separators: {}",
                school_id
            )));
        }
        let school = School {
            id: school_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            registered_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            student_count: 0,
        };

        let _guard = self.lock()?;
        if !self.store.register(school.clone())? {
            warn!(school_id, "duplicate school registration rejected");
            return Err(PortalError::DuplicateSchool(school_id.to_string()));
        }
        info!(school_id, name, "school registered");
        Ok(school)
    }

    pub fn delete(&self, school_id: &str) -> Result<bool> {
        let _guard = self.lock()?;
        let removed = self.store.delete(school_id)?;
        info!(school_id, removed, "school deleted");
        Ok(removed)
    }

    /// Validates and stores one term spreadsheet, then refreshes the
    /// school's cached student count from it.
    pub fn upload(
        &self,
        school_id: &str,
        academic_year: &str,
        term: &str,
        bytes: &[u8],
    ) -> Result<UploadSummary> {
        if bytes.is_empty() {
            return Err(PortalError::NoFile);
        }
        let Some(term) = Term::parse(term) else {
            return Err(PortalError::BadParams(format!("unknown term: {}", term)));
        };
        if !is_safe_component(academic_year) {
            return Err(PortalError::BadParams(format!(
                "invalid academic year: {}",
                academic_year
            )));
        }
        if self.store.find(school_id)?.is_none() {
            return Err(PortalError::UnknownSchool(school_id.to_string()));
        }

        xlsx::check_workbook_container(bytes)
            .map_err(|e| PortalError::BadWorkbook(format!("{:#}", e)))?;
        let sheet = xlsx::read_term_sheet_bytes(bytes)
            .map_err(|e| PortalError::BadWorkbook(format!("{:#}", e)))?;
        self.commit_upload(school_id, academic_year, term, bytes, sheet.student_count())
    }

    /// Writes an already validated term file. Registration is checked again
    /// under the write lock, so a school deleted after validation gets no data.
    pub(crate) fn commit_upload(
        &self,
        school_id: &str,
        academic_year: &str,
        term: Term,
        bytes: &[u8],
        student_count: usize,
    ) -> Result<UploadSummary> {
        let _guard = self.lock()?;
        if self.store.find(school_id)?.is_none() {
            warn!(school_id, "school removed before upload was stored");
            return Err(PortalError::UnknownSchool(school_id.to_string()));
        }
        let path = self
            .store
            .write_term_file(school_id, academic_year, term, bytes)?;
        self.store.set_student_count(school_id, student_count)?;
        info!(
            school_id,
            academic_year,
            term = term.as_str(),
            student_count,
            "term results uploaded"
        );

        Ok(UploadSummary {
            school_id: school_id.to_string(),
            academic_year: academic_year.to_string(),
            term: term.as_str().to_string(),
            student_count,
            path,
        })
    }

    pub fn lookup(&self, school_id: &str, academic_year: &str, roll: &str) -> Result<ReportCard> {
        report::resolve(&self.store, school_id, academic_year, roll)
    }

    /// Returns the download file name and the PDF bytes.
    pub fn report_pdf(
        &self,
        school_id: &str,
        academic_year: &str,
        roll: &str,
    ) -> Result<(String, Vec<u8>)> {
        let card = self.lookup(school_id, academic_year, roll)?;
        let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
        let bytes = pdf::render_report_card(&card, &generated_at)?;
        Ok((card.pdf_file_name(), bytes))
    }

    pub fn dashboard(&self) -> Result<DashboardStats> {
        let schools = self.store.load()?;
        let total_students = schools.iter().map(|s| s.student_count).sum();
        let active_years = self.store.active_years(&schools)?.len();

        let mut recent = schools.clone();
        recent.sort_by(|a, b| b.registered_date.cmp(&a.registered_date));
        recent.truncate(RECENT_SCHOOLS);

        Ok(DashboardStats {
            total_schools: schools.len(),
            total_students,
            active_years,
            recent_schools: recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::fixtures::term_workbook;

    fn portal() -> (tempfile::TempDir, Portal) {
        let dir = tempfile::tempdir().expect("tempdir");
        let portal = Portal::open(dir.path()).expect("open portal");
        (dir, portal)
    }

    #[test]
    fn upload_updates_student_count() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "").expect("register");
        let bytes = term_workbook(
            &["Math"],
            &[(1, "A", "I", &[10.0]), (2, "B", "I", &[12.0]), (3, "C", "I", &[9.0])],
        );

        let summary = portal
            .upload("S1", "2024-25", "1st_term", &bytes)
            .expect("upload");
        assert_eq!(summary.student_count, 3);
        assert_eq!(summary.message(), "Results uploaded successfully! Students: 3");
        assert!(summary.path.ends_with("data/S1/2024-25/1st_term.xlsx"));

        let schools = portal.schools().expect("schools");
        assert_eq!(schools[0].student_count, 3);
    }

    #[test]
    fn upload_rejects_non_workbook_without_writing() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "").expect("register");
        let err = portal
            .upload("S1", "2024-25", "2nd_term", b"not a workbook")
            .expect_err("rejected");
        assert_eq!(err.code(), "bad_workbook");
        assert!(!portal
            .store()
            .term_path("S1", "2024-25", Term::Second)
            .exists());
    }

    #[test]
    fn upload_validates_inputs() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "").expect("register");
        let bytes = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);

        assert_eq!(
            portal.upload("S1", "2024-25", "1st_term", b"").expect_err("empty").code(),
            "no_file"
        );
        assert_eq!(
            portal.upload("S1", "2024-25", "3rd_term", &bytes).expect_err("term").code(),
            "bad_params"
        );
        assert_eq!(
            portal.upload("S1", "../x", "1st_term", &bytes).expect_err("year").code(),
            "bad_params"
        );
        assert_eq!(
            portal.upload("NOPE", "2024-25", "1st_term", &bytes).expect_err("school").code(),
            "unknown_school"
        );
    }

    #[test]
    fn upload_after_concurrent_delete_leaves_no_data() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "").expect("register");
        let bytes = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        let sheet = xlsx::read_term_sheet_bytes(&bytes).expect("parse");

        // Validation already passed; the school goes away before the write.
        assert!(portal.delete("S1").expect("delete"));
        let err = portal
            .commit_upload("S1", "2024-25", Term::First, &bytes, sheet.student_count())
            .expect_err("school is gone");
        assert_eq!(err.code(), "unknown_school");
        assert!(!portal.store().school_dir("S1").exists());
    }

    #[test]
    fn duplicate_register_and_delete() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "a@b.c").expect("register");
        let err = portal.register("S1", "Other", "").expect_err("duplicate");
        assert_eq!(err.to_string(), "School ID already exists!");

        let bytes = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        portal.upload("S1", "2024-25", "1st_term", &bytes).expect("upload");
        assert!(portal.delete("S1").expect("delete"));
        assert!(!portal.store().school_dir("S1").exists());
        assert!(portal.schools().expect("schools").is_empty());
    }

    #[test]
    fn dashboard_counts_students_and_years() {
        let (_dir, portal) = portal();
        portal.register("A", "Alpha", "").expect("register");
        portal.register("B", "Beta", "").expect("register");
        let two = term_workbook(&["Math"], &[(1, "A", "I", &[10.0]), (2, "B", "I", &[11.0])]);
        let one = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        portal.upload("A", "2024-25", "1st_term", &two).expect("upload");
        portal.upload("B", "2023-24", "1st_term", &one).expect("upload");

        let stats = portal.dashboard().expect("dashboard");
        assert_eq!(stats.total_schools, 2);
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.active_years, 2);
        assert_eq!(stats.recent_schools.len(), 2);
    }

    #[test]
    fn report_pdf_is_named_after_school_roll_and_year() {
        let (_dir, portal) = portal();
        portal.register("S1", "Green Valley", "").expect("register");
        let bytes = term_workbook(&["Math", "English"], &[(7, "Asha", "III", &[18.0, 12.0])]);
        portal.upload("S1", "2024-25", "1st_term", &bytes).expect("upload");
        portal.upload("S1", "2024-25", "2nd_term", &bytes).expect("upload");

        let (name, pdf) = portal.report_pdf("S1", "2024-25", "7").expect("pdf");
        assert_eq!(name, "ReportCard_S1_7_2024-25.pdf");
        assert!(pdf.starts_with(b"%PDF"));
    }
}

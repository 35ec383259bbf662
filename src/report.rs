use crate::calc::{self, StudentResult};
use crate::error::{PortalError, Result};
use crate::sheet::{CLASS_COLUMN, NAME_COLUMN};
use crate::store::{is_safe_component, SchoolStore, Term};
use crate::xlsx;
use serde::Serialize;

pub const UNKNOWN_SCHOOL_NAME: &str = "Unknown School";

/// One student's report card for an academic year. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCard {
    pub school_id: String,
    pub school_name: String,
    pub academic_year: String,
    pub name: String,
    pub roll: String,
    pub class: String,
    pub result: StudentResult,
}

impl ReportCard {
    /// Download name for the PDF. Quotes, backslashes, path separators and
    /// control characters become `_` so the name fits a quoted header value.
    pub fn pdf_file_name(&self) -> String {
        format!(
            "ReportCard_{}_{}_{}.pdf",
            self.school_id, self.roll, self.academic_year
        )
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
    }
}

/// Reads both term sheets for the school/year and aggregates the student's
/// marks. Both term files must have been uploaded.
pub fn resolve(
    store: &SchoolStore,
    school_id: &str,
    academic_year: &str,
    roll: &str,
) -> Result<ReportCard> {
    if !is_safe_component(school_id) || !is_safe_component(academic_year) {
        return Err(PortalError::ResultsUnavailable);
    }
    let term1_path = store.term_path(school_id, academic_year, Term::First);
    let term2_path = store.term_path(school_id, academic_year, Term::Second);
    if !term1_path.is_file() || !term2_path.is_file() {
        return Err(PortalError::ResultsUnavailable);
    }

    let sheet1 = xlsx::read_term_sheet(&term1_path)?;
    let sheet2 = xlsx::read_term_sheet(&term2_path)?;
    let row1 = sheet1.find_roll(roll)?;
    let row2 = sheet2.find_roll(roll)?;

    let Some(student) = row1.or(row2) else {
        return Err(PortalError::RollNotFound);
    };
    let name = student.text(NAME_COLUMN);
    let class = student.text(CLASS_COLUMN);

    let subjects = calc::subjects_for_class(&class, &sheet1);
    let result = calc::compute_student_result(row1.as_ref(), row2.as_ref(), &subjects);

    let school_name = store
        .find(school_id)?
        .map(|s| s.name)
        .unwrap_or_else(|| UNKNOWN_SCHOOL_NAME.to_string());

    tracing::debug!(
        school_id,
        academic_year,
        roll,
        subjects = result.subjects.len(),
        "resolved report card"
    );

    Ok(ReportCard {
        school_id: school_id.to_string(),
        school_name,
        academic_year: academic_year.to_string(),
        name,
        roll: roll.to_string(),
        class,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::School;
    use crate::xlsx::fixtures::term_workbook;

    fn store_with_terms(term1: &[u8], term2: Option<&[u8]>) -> (tempfile::TempDir, SchoolStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SchoolStore::open(dir.path()).expect("open store");
        store
            .register(School {
                id: "S1".into(),
                name: "Green Valley".into(),
                email: String::new(),
                registered_date: String::new(),
                student_count: 0,
            })
            .expect("register");
        store
            .write_term_file("S1", "2024-25", Term::First, term1)
            .expect("write term1");
        if let Some(bytes) = term2 {
            store
                .write_term_file("S1", "2024-25", Term::Second, bytes)
                .expect("write term2");
        }
        (dir, store)
    }

    #[test]
    fn known_class_uses_class_subjects() {
        let t1 = term_workbook(
            &["Math", "English", "Hindi", "Art"],
            &[(101, "Asha", "LKG", &[18.0, 16.0, 0.0, 20.0])],
        );
        let t2 = term_workbook(
            &["Math", "English", "Hindi", "Art"],
            &[(101, "Asha", "LKG", &[20.0, 14.0, 0.0, 20.0])],
        );
        let (_dir, store) = store_with_terms(&t1, Some(&t2));

        let card = resolve(&store, "S1", "2024-25", "101").expect("resolve");
        assert_eq!(card.name, "Asha");
        assert_eq!(card.class, "LKG");
        assert_eq!(card.school_name, "Green Valley");
        let names: Vec<&str> = card.result.subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["Math", "English"]);
        assert_eq!(card.result.total1, 34.0);
        assert_eq!(card.result.total2, 34.0);
        assert_eq!(card.result.combined_percent, 85.0);
        assert_eq!(card.pdf_file_name(), "ReportCard_S1_101_2024-25.pdf");
    }

    #[test]
    fn student_only_in_second_term_takes_identity_from_it() {
        let t1 = term_workbook(&["Math"], &[(1, "Other", "II", &[10.0])]);
        let t2 = term_workbook(&["Math"], &[(2, "Late Joiner", "II", &[15.0])]);
        let (_dir, store) = store_with_terms(&t1, Some(&t2));

        let card = resolve(&store, "S1", "2024-25", "2").expect("resolve");
        assert_eq!(card.name, "Late Joiner");
        assert_eq!(card.result.total1, 0.0);
        assert_eq!(card.result.total2, 15.0);
        assert_eq!(card.result.percent2, 75.0);
        assert_eq!(card.result.combined_percent, 37.5);
    }

    #[test]
    fn missing_term_file_reports_unavailable() {
        let t1 = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        let (_dir, store) = store_with_terms(&t1, None);
        let err = resolve(&store, "S1", "2024-25", "1").expect_err("unavailable");
        assert!(matches!(err, PortalError::ResultsUnavailable));
    }

    #[test]
    fn unknown_roll_is_not_found() {
        let t1 = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        let (_dir, store) = store_with_terms(&t1, Some(&t1));
        let err = resolve(&store, "S1", "2024-25", "999").expect_err("not found");
        assert!(matches!(err, PortalError::RollNotFound));
    }

    #[test]
    fn unregistered_school_name_falls_back() {
        let t1 = term_workbook(&["Math"], &[(1, "A", "I", &[10.0])]);
        let (_dir, store) = store_with_terms(&t1, Some(&t1));
        let mut schools = store.load().expect("load");
        schools.clear();
        store.save(&schools).expect("save");

        let card = resolve(&store, "S1", "2024-25", "1").expect("resolve");
        assert_eq!(card.school_name, UNKNOWN_SCHOOL_NAME);
    }

    #[test]
    fn pdf_file_name_strips_header_breaking_characters() {
        let card = ReportCard {
            school_id: "S1".into(),
            school_name: "Green Valley".into(),
            academic_year: "2024-25".into(),
            name: "Asha".into(),
            roll: "7\"b\r\n/x".into(),
            class: "V".into(),
            result: StudentResult {
                subjects: Vec::new(),
                total1: 0.0,
                total2: 0.0,
                percent1: 0.0,
                percent2: 0.0,
                combined_percent: 0.0,
            },
        };
        assert_eq!(card.pdf_file_name(), "ReportCard_S1_7_b___x_2024-25.pdf");
    }
}

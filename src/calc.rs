use crate::sheet::{StudentRow, TermSheet};
use serde::Serialize;

/// Marks are out of 20 per subject per term. Fixed grading policy, never
/// derived from the uploaded sheets.
pub const MAX_MARKS_PER_TERM: f64 = 20.0;

const EARLY_YEARS: &[&str] = &["Math", "English", "Hindi"];
const PRIMARY: &[&str] = &["Math", "English", "Hindi", "EVS", "GK", "Computer"];
const MIDDLE: &[&str] = &["Math", "English", "Hindi", "Science", "Computer", "Sanskrit"];
const SECONDARY: &[&str] = &["Math", "English", "Hindi", "Science", "Sanskrit", "SST"];
const SENIOR_SECONDARY: &[&str] = &[
    "Math", "English", "Hindi", "Bio", "Physics", "Chemistry", "Sanskrit", "SST",
];

/// Fixed class label -> subject list table.
pub fn class_subjects(class: &str) -> Option<&'static [&'static str]> {
    match class {
        "Nursery" | "LKG" | "UKG" => Some(EARLY_YEARS),
        "I" | "II" | "III" | "IV" | "V" => Some(PRIMARY),
        "VI" | "VII" | "VIII" => Some(MIDDLE),
        "IX" | "X" => Some(SECONDARY),
        "XI" | "XII" => Some(SENIOR_SECONDARY),
        _ => None,
    }
}

/// Subjects for a student: the class table when the class is known,
/// otherwise every non-metadata column of the first-term sheet.
pub fn subjects_for_class(class: &str, first_term: &TermSheet) -> Vec<String> {
    match class_subjects(class) {
        Some(list) => list.iter().map(|s| s.to_string()).collect(),
        None => first_term.subject_columns(),
    }
}

/// Two-decimal rounding, half away from zero.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn term_mark(row: Option<&StudentRow<'_>>, subject: &str) -> f64 {
    row.and_then(|r| r.get(subject))
        .map(|c| c.as_mark())
        .unwrap_or(0.0)
}

fn percent(obtained: f64, max: f64) -> f64 {
    if max > 0.0 {
        round_2_decimals(obtained / max * 100.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectMarks {
    pub subject: String,
    pub term1: f64,
    pub term2: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub subjects: Vec<SubjectMarks>,
    pub total1: f64,
    pub total2: f64,
    pub percent1: f64,
    pub percent2: f64,
    pub combined_percent: f64,
}

impl StudentResult {
    pub fn grand_total(&self) -> f64 {
        self.total1 + self.total2
    }
}

/// Aggregate one student's two term rows. A subject counts only when at
/// least one of its term marks is positive.
pub fn compute_student_result(
    term1: Option<&StudentRow<'_>>,
    term2: Option<&StudentRow<'_>>,
    subjects: &[String],
) -> StudentResult {
    let mut rows: Vec<SubjectMarks> = Vec::new();
    let mut total1 = 0.0;
    let mut total2 = 0.0;

    for subject in subjects {
        let m1 = term_mark(term1, subject);
        let m2 = term_mark(term2, subject);
        if m1 <= 0.0 && m2 <= 0.0 {
            continue;
        }
        total1 += m1;
        total2 += m2;
        rows.push(SubjectMarks {
            subject: subject.clone(),
            term1: m1,
            term2: m2,
            total: m1 + m2,
        });
    }

    let included = rows.len() as f64;
    let max_term = MAX_MARKS_PER_TERM * included;
    StudentResult {
        percent1: percent(total1, max_term),
        percent2: percent(total2, max_term),
        combined_percent: percent(total1 + total2, 2.0 * max_term),
        subjects: rows,
        total1,
        total2,
    }
}

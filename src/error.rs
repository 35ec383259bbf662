use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortalError>;

/// Failures surfaced to users. The display text is the message shown on
/// the page; `code` is the stable identifier used by the stdio channel.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{0}")]
    BadParams(String),

    #[error("School ID already exists!")]
    DuplicateSchool(String),

    #[error("Unknown school: {0}")]
    UnknownSchool(String),

    #[error("No file selected!")]
    NoFile,

    #[error("Uploaded file is not a readable .xlsx workbook: {0}")]
    BadWorkbook(String),

    #[error("Result data not available for selected school and year")]
    ResultsUnavailable,

    #[error("Roll number not found")]
    RollNotFound,

    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
}

impl PortalError {
    pub fn code(&self) -> &'static str {
        match self {
            PortalError::BadParams(_) => "bad_params",
            PortalError::DuplicateSchool(_) => "duplicate_school",
            PortalError::UnknownSchool(_) => "unknown_school",
            PortalError::NoFile => "no_file",
            PortalError::BadWorkbook(_) => "bad_workbook",
            PortalError::ResultsUnavailable => "results_unavailable",
            PortalError::RollNotFound => "roll_not_found",
            PortalError::Io(_) => "io_failed",
        }
    }
}

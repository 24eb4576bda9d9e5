use thiserror::Error;

use crate::submit::SubmitError;
use crate::wizard::ValidationIssue;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File is empty or has no header row")]
    EmptyFile,

    #[error("Not a CSV file: {0}")]
    UnsupportedFile(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Column not found in file: {0}")]
    UnknownColumn(String),

    #[error("Invalid mapping override (expected field=Header): {0}")]
    InvalidOverride(String),

    #[error("{}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Cannot {action} while at the {step} step")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    #[error("No valid transactions to import")]
    NothingToImport,

    #[error("An import is already in progress")]
    ImportInProgress,

    #[error("Import failed: {0}")]
    Submit(#[from] SubmitError),

    #[error("Settings error: {0}")]
    Settings(String),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    let parts: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    format!("Not ready for preview: {}", parts.join("; "))
}

pub type Result<T> = std::result::Result<T, ImportError>;

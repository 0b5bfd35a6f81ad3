use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Could not extract text from {path}: {detail}")]
    Extraction { path: String, detail: String },

    #[error("No runsheet date found in {0} (pass --date YYYY-MM-DD)")]
    NoRunsheetDate(String),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("No job {job_number} on {date}")]
    UnknownJob { date: String, job_number: String },

    #[error("Parser config error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

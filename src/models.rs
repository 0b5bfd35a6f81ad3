use std::path::PathBuf;

use serde::Serialize;

/// One job recovered from a runsheet page. Only `job_number` is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JobRecord {
    pub job_number: String,
    pub customer: Option<String>,
    pub activity: Option<String>,
    pub priority: Option<String>,
    pub address_lines: Vec<String>,
    pub postcode: Option<String>,
}

impl JobRecord {
    /// Address lines joined for storage and display.
    pub fn address(&self) -> String {
        self.address_lines.join(", ")
    }
}

/// Text of one extracted page, one string per line.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

impl ExtractedDocument {
    pub fn all_lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Dnco,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Dnco => "dnco",
        }
    }

    pub fn from_db(s: &str) -> Self {
        if s == "dnco" {
            Self::Dnco
        } else {
            Self::Completed
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: i64,
    pub date: String,
    pub job_number: String,
    pub customer: Option<String>,
    pub activity: Option<String>,
    pub priority: Option<String>,
    pub address: String,
    pub postcode: Option<String>,
    pub status: JobStatus,
}

#[derive(Debug, Clone)]
pub struct JobAudit {
    pub action: String,
    pub detail: Option<String>,
    pub at: String,
    pub date: String,
}

/// One job line on a payslip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayItem {
    pub job_number: String,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payslip {
    pub pay_date: Option<String>,
    pub period_end: Option<String>,
    pub gross: Option<f64>,
    pub net: Option<f64>,
    pub items: Vec<PayItem>,
}

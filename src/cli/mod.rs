pub mod config;
pub mod import;
pub mod init;
pub mod jobs;
pub mod parse;
pub mod payslips;
pub mod reconcile;
pub mod status;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{LedgerError, Result};
use crate::runsheet::{RunsheetJobParser, Strategy};
use crate::settings::{db_path, load_settings};

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate(raw.to_string()))
}

/// Resolve `--date` or `--from/--to` into an inclusive ISO range. With no
/// filter the range is open-ended.
pub(crate) fn date_range(
    date: Option<&str>,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<(String, String)> {
    if let Some(d) = date {
        let d = parse_date(d)?.format("%Y-%m-%d").to_string();
        return Ok((d.clone(), d));
    }
    let from = match from_date {
        Some(f) => parse_date(f)?.format("%Y-%m-%d").to_string(),
        None => "0000-01-01".to_string(),
    };
    let to = match to_date {
        Some(t) => parse_date(t)?.format("%Y-%m-%d").to_string(),
        None => "9999-12-31".to_string(),
    };
    if from > to {
        return Err(LedgerError::Other(format!("--from {from} is after --to {to}")));
    }
    Ok((from, to))
}

pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(LedgerError::Other(
            "Database not found. Run `runledger init` to set up.".to_string(),
        ));
    }
    get_connection(&path)
}

pub(crate) fn load_parser() -> Result<RunsheetJobParser> {
    RunsheetJobParser::new(&load_settings().parser)
}

#[derive(Parser)]
#[command(name = "runledger", about = "Track runsheet jobs and reconcile them against payslips.")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for runledger data (default: ~/Documents/runledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import runsheet or payslip documents (PDF, or extracted .txt).
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Parse a runsheet and print the jobs found, without storing them.
    Parse {
        /// Runsheet PDF or extracted .txt file
        file: String,
        /// Extraction strategy
        #[arg(long, value_enum, default_value_t = Strategy::Auto)]
        strategy: Strategy,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Query and update stored jobs.
    Jobs {
        #[command(subcommand)]
        command: JobsCommands,
    },
    /// List imported payslips.
    Payslips,
    /// Compare runsheet jobs with payslip items.
    Reconcile {
        /// Start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Show data directory and summary statistics.
    Status,
    /// Inspect parser configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Import one or more runsheets.
    Runsheet {
        /// Runsheet files
        #[arg(required = true)]
        files: Vec<String>,
        /// Runsheet date (YYYY-MM-DD); overrides any date in the document
        #[arg(long)]
        date: Option<String>,
        /// Extraction strategy
        #[arg(long, value_enum, default_value_t = Strategy::Auto)]
        strategy: Strategy,
    },
    /// Import one or more payslips.
    Payslip {
        /// Payslip files
        #[arg(required = true)]
        files: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum JobsCommands {
    /// List stored jobs.
    List {
        /// Single day: YYYY-MM-DD
        #[arg(long, conflicts_with_all = ["from_date", "to_date"])]
        date: Option<String>,
        /// Start date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Mark a job as Did Not Carry Out.
    Dnco {
        /// Runsheet date: YYYY-MM-DD
        date: String,
        /// Job number
        job_number: String,
        /// Mark the job completed again
        #[arg(long)]
        undo: bool,
    },
    /// Show the audit trail for a job number.
    History {
        job_number: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective parser configuration as JSON.
    Show,
    /// Print the settings file path.
    Path,
}

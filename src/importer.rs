use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::{self, Upsert};
use crate::error::{LedgerError, Result};
use crate::models::{JobRecord, Payslip};
use crate::payslip::parse_payslip;
use crate::pdf::extract_document;
use crate::runsheet::{detect_runsheet_date, extract_jobs, RunsheetJobParser, Strategy};

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunsheetOptions {
    /// Overrides any date found in the document.
    pub date: Option<NaiveDate>,
    pub strategy: Strategy,
}

/// A runsheet extracted and parsed, not yet stored.
#[derive(Debug, Clone)]
pub struct ParsedRunsheet {
    pub path: PathBuf,
    pub checksum: String,
    pub date: NaiveDate,
    pub jobs: Vec<JobRecord>,
}

/// Extract and parse one runsheet. Pages are parsed independently.
pub fn parse_runsheet(path: &Path, parser: &RunsheetJobParser, opts: RunsheetOptions) -> Result<ParsedRunsheet> {
    let checksum = compute_checksum(path)?;
    let doc = extract_document(path)?;
    let date = opts
        .date
        .or_else(|| detect_runsheet_date(doc.all_lines(), &doc.path))
        .ok_or_else(|| LedgerError::NoRunsheetDate(path.display().to_string()))?;
    let jobs: Vec<JobRecord> = doc
        .pages
        .iter()
        .flat_map(|page| extract_jobs(parser, &page.lines, opts.strategy))
        .collect();
    tracing::debug!(path = %path.display(), jobs = jobs.len(), %date, "parsed runsheet");
    Ok(ParsedRunsheet {
        path: path.to_path_buf(),
        checksum,
        date,
        jobs,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunsheetImport {
    pub date: Option<String>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub duplicate_file: bool,
}

fn duplicate() -> RunsheetImport {
    RunsheetImport {
        duplicate_file: true,
        ..Default::default()
    }
}

/// Write a parsed runsheet in one transaction.
pub fn store_runsheet(conn: &mut Connection, parsed: &ParsedRunsheet) -> Result<RunsheetImport> {
    if db::is_imported(conn, &parsed.checksum)? {
        return Ok(duplicate());
    }
    let date = parsed.date.format("%Y-%m-%d").to_string();
    let tx = conn.transaction()?;
    let import_id = db::record_import(&tx, file_name(&parsed.path), "runsheet", &parsed.checksum, parsed.jobs.len())?;
    let mut result = RunsheetImport {
        date: Some(date.clone()),
        ..Default::default()
    };
    for job in &parsed.jobs {
        match db::upsert_job(&tx, &date, job, Some(import_id))? {
            Upsert::Inserted => result.inserted += 1,
            Upsert::Updated => result.updated += 1,
            Upsert::Unchanged => result.unchanged += 1,
        }
    }
    tx.commit()?;
    tracing::info!(
        file = file_name(&parsed.path),
        date = %date,
        inserted = result.inserted,
        updated = result.updated,
        "imported runsheet"
    );
    Ok(result)
}

/// Import many runsheets. Extraction and parsing run in parallel; writes are
/// sequential. A failing file is reported in its slot and never stops the
/// rest of the batch.
pub fn import_runsheets(
    conn: &mut Connection,
    paths: &[PathBuf],
    parser: &RunsheetJobParser,
    opts: RunsheetOptions,
) -> Vec<(PathBuf, Result<RunsheetImport>)> {
    let parsed: Vec<(PathBuf, Result<ParsedRunsheet>)> = paths
        .par_iter()
        .map(|path| (path.clone(), parse_runsheet(path, parser, opts)))
        .collect();

    parsed
        .into_iter()
        .map(|(path, result)| {
            let outcome = result.and_then(|p| store_runsheet(conn, &p));
            if let Err(e) = &outcome {
                tracing::warn!(file = %path.display(), error = %e, "runsheet import failed");
            }
            (path, outcome)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayslipImport {
    pub pay_date: Option<String>,
    pub items: usize,
    pub items_total: f64,
    pub duplicate_file: bool,
}

pub fn parse_payslip_file(path: &Path) -> Result<(String, Payslip)> {
    let checksum = compute_checksum(path)?;
    let doc = extract_document(path)?;
    Ok((checksum, parse_payslip(doc.all_lines())))
}

fn store_payslip(conn: &mut Connection, path: &Path, checksum: &str, slip: &Payslip) -> Result<PayslipImport> {
    if db::is_imported(conn, checksum)? {
        return Ok(PayslipImport {
            duplicate_file: true,
            ..Default::default()
        });
    }
    let tx = conn.transaction()?;
    let import_id = db::record_import(&tx, file_name(path), "payslip", checksum, slip.items.len())?;
    db::insert_payslip(&tx, slip, import_id)?;
    tx.commit()?;
    tracing::info!(file = file_name(path), items = slip.items.len(), "imported payslip");
    Ok(PayslipImport {
        pay_date: slip.pay_date.clone(),
        items: slip.items.len(),
        items_total: slip.items_total(),
        duplicate_file: false,
    })
}

pub fn import_payslips(conn: &mut Connection, paths: &[PathBuf]) -> Vec<(PathBuf, Result<PayslipImport>)> {
    let parsed: Vec<(PathBuf, Result<(String, Payslip)>)> = paths
        .par_iter()
        .map(|path| (path.clone(), parse_payslip_file(path)))
        .collect();

    parsed
        .into_iter()
        .map(|(path, result)| {
            let outcome = result.and_then(|(checksum, slip)| store_payslip(conn, &path, &checksum, &slip));
            if let Err(e) = &outcome {
                tracing::warn!(file = %path.display(), error = %e, "payslip import failed");
            }
            (path, outcome)
        })
        .collect()
}

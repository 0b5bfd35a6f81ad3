use std::path::PathBuf;

use crate::cli::{load_parser, open_db, parse_date};
use crate::error::{LedgerError, Result};
use crate::fmt::money;
use crate::importer::{import_payslips, import_runsheets, RunsheetOptions};
use crate::runsheet::Strategy;

fn finish(failed: usize, total: usize) -> Result<()> {
    if failed > 0 {
        return Err(LedgerError::Other(format!("{failed} of {total} files failed to import")));
    }
    Ok(())
}

pub fn runsheets(files: &[String], date: Option<&str>, strategy: Strategy) -> Result<()> {
    let opts = RunsheetOptions {
        date: date.map(parse_date).transpose()?,
        strategy,
    };
    let parser = load_parser()?;
    let mut conn = open_db()?;
    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();

    let mut failed = 0usize;
    for (path, outcome) in import_runsheets(&mut conn, &paths, &parser, opts) {
        match outcome {
            Ok(r) if r.duplicate_file => {
                println!("{}: already imported (duplicate checksum)", path.display());
            }
            Ok(r) => println!(
                "{}: {}: {} new, {} updated, {} unchanged",
                path.display(),
                r.date.unwrap_or_default(),
                r.inserted,
                r.updated,
                r.unchanged
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", path.display());
            }
        }
    }
    finish(failed, paths.len())
}

pub fn payslips(files: &[String]) -> Result<()> {
    let mut conn = open_db()?;
    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();

    let mut failed = 0usize;
    for (path, outcome) in import_payslips(&mut conn, &paths) {
        match outcome {
            Ok(r) if r.duplicate_file => {
                println!("{}: already imported (duplicate checksum)", path.display());
            }
            Ok(r) => println!(
                "{}: pay date {}, {} job items, {}",
                path.display(),
                r.pay_date.as_deref().unwrap_or("unknown"),
                r.items,
                money(r.items_total)
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {e}", path.display());
            }
        }
    }
    finish(failed, paths.len())
}

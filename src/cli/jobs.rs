use comfy_table::{Cell, Table};

use crate::cli::{date_range, open_db, parse_date};
use crate::db::{job_history, jobs_between, set_job_status};
use crate::error::Result;
use crate::fmt::opt;
use crate::models::JobStatus;

pub fn list(date: Option<&str>, from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let (from, to) = date_range(date, from_date, to_date)?;
    let conn = open_db()?;
    let jobs = jobs_between(&conn, &from, &to)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Job", "Customer", "Activity", "Priority", "Address", "Postcode", "Status"]);
    for job in &jobs {
        table.add_row(vec![
            Cell::new(&job.date),
            Cell::new(&job.job_number),
            Cell::new(opt(&job.customer)),
            Cell::new(opt(&job.activity)),
            Cell::new(opt(&job.priority)),
            Cell::new(&job.address),
            Cell::new(opt(&job.postcode)),
            Cell::new(job.status.as_str()),
        ]);
    }
    println!("Jobs ({})\n{table}", jobs.len());
    Ok(())
}

pub fn dnco(date: &str, job_number: &str, undo: bool) -> Result<()> {
    let date = parse_date(date)?.format("%Y-%m-%d").to_string();
    let status = if undo { JobStatus::Completed } else { JobStatus::Dnco };
    let conn = open_db()?;
    if set_job_status(&conn, &date, job_number, status)? {
        println!("Job {job_number} on {date} marked {}", status.as_str());
    } else {
        println!("Job {job_number} on {date} is already {}", status.as_str());
    }
    Ok(())
}

pub fn history(job_number: &str) -> Result<()> {
    let conn = open_db()?;
    let entries = job_history(&conn, job_number)?;
    if entries.is_empty() {
        println!("No history for job {job_number}");
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["At", "Runsheet Date", "Action", "Detail"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.at),
            Cell::new(entry.date),
            Cell::new(entry.action),
            Cell::new(entry.detail.unwrap_or_default()),
        ]);
    }
    println!("Job {job_number}\n{table}");
    Ok(())
}

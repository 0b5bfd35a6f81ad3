use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{date_range, open_db};
use crate::error::Result;
use crate::fmt::{money, opt};
use crate::reconciler;

pub fn run(from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let (from, to) = date_range(None, from_date, to_date)?;
    let conn = open_db()?;
    let report = reconciler::reconcile(&conn, &from, &to)?;

    println!(
        "{} paid ({}), {} unpaid, {} DNCO paid, {} unmatched pay items",
        report.paid.len(),
        money(report.total_paid),
        report.unpaid.len(),
        report.dnco_paid.len(),
        report.unmatched_items.len()
    );

    if !report.unpaid.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Job", "Customer", "Activity", "Postcode"]);
        for job in &report.unpaid {
            table.add_row(vec![
                Cell::new(&job.date),
                Cell::new(&job.job_number),
                Cell::new(opt(&job.customer)),
                Cell::new(opt(&job.activity)),
                Cell::new(opt(&job.postcode)),
            ]);
        }
        println!("\n{}\n{table}", "UNPAID JOBS".red().bold());
    }

    if !report.dnco_paid.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Job", "Customer", "Amount"]);
        for paid in &report.dnco_paid {
            table.add_row(vec![
                Cell::new(&paid.job.date),
                Cell::new(&paid.job.job_number),
                Cell::new(opt(&paid.job.customer)),
                Cell::new(money(paid.amount)),
            ]);
        }
        println!("\n{}\n{table}", "PAID BUT MARKED DNCO".yellow().bold());
    }

    if !report.unmatched_items.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Pay Date", "Job", "Description", "Amount"]);
        for (pay_date, item) in &report.unmatched_items {
            table.add_row(vec![
                Cell::new(opt(pay_date)),
                Cell::new(&item.job_number),
                Cell::new(&item.description),
                Cell::new(money(item.amount)),
            ]);
        }
        println!("\n{}\n{table}", "PAY ITEMS WITH NO RUNSHEET JOB".yellow().bold());
    }

    if report.unpaid.is_empty() && report.dnco_paid.is_empty() && report.unmatched_items.is_empty() {
        println!("{}", "Reconciled: every job accounted for.".green());
    }
    Ok(())
}

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::db;
use crate::error::Result;
use crate::models::{JobStatus, PayItem, StoredJob};

pub struct PaidJob {
    pub job: StoredJob,
    pub amount: f64,
}

pub struct ReconcileReport {
    pub paid: Vec<PaidJob>,
    pub unpaid: Vec<StoredJob>,
    pub dnco_paid: Vec<PaidJob>,
    pub unmatched_items: Vec<(Option<String>, PayItem)>,
    pub total_paid: f64,
}

/// Match runsheet jobs dated `from..=to` against every payslip item by job
/// number. Payslip items dated in the range with no runsheet job at all are
/// reported as unmatched.
pub fn reconcile(conn: &Connection, from: &str, to: &str) -> Result<ReconcileReport> {
    let jobs = db::jobs_between(conn, from, to)?;
    let items = db::all_pay_items(conn)?;

    let mut paid_by_job: HashMap<&str, f64> = HashMap::new();
    for (_, item) in &items {
        *paid_by_job.entry(item.job_number.as_str()).or_default() += item.amount;
    }

    let mut report = ReconcileReport {
        paid: Vec::new(),
        unpaid: Vec::new(),
        dnco_paid: Vec::new(),
        unmatched_items: Vec::new(),
        total_paid: 0.0,
    };

    for job in &jobs {
        match (paid_by_job.get(job.job_number.as_str()), job.status) {
            (Some(&amount), JobStatus::Completed) => {
                report.total_paid += amount;
                report.paid.push(PaidJob { job: job.clone(), amount });
            }
            (Some(&amount), JobStatus::Dnco) => {
                report.dnco_paid.push(PaidJob { job: job.clone(), amount });
            }
            (None, JobStatus::Completed) => report.unpaid.push(job.clone()),
            (None, JobStatus::Dnco) => {}
        }
    }

    let mut known: HashSet<String> = HashSet::new();
    let mut stmt = conn.prepare("SELECT DISTINCT job_number FROM jobs")?;
    for number in stmt.query_map([], |r| r.get::<_, String>(0))? {
        known.insert(number?);
    }
    for (pay_date, item) in items {
        let in_range = pay_date
            .as_deref()
            .is_some_and(|d| d >= from && d <= to);
        if in_range && !known.contains(&item.job_number) {
            report.unmatched_items.push((pay_date, item));
        }
    }

    report.total_paid = (report.total_paid * 100.0).round() / 100.0;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db, insert_payslip, record_import, set_job_status, upsert_job};
    use crate::models::{JobRecord, Payslip};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_job(conn: &Connection, date: &str, number: &str) {
        let job = JobRecord {
            job_number: number.to_string(),
            ..Default::default()
        };
        upsert_job(conn, date, &job, None).unwrap();
    }

    fn add_payslip(conn: &Connection, pay_date: &str, items: &[(&str, f64)]) {
        let import_id = record_import(conn, "slip.pdf", "payslip", pay_date, items.len()).unwrap();
        let slip = Payslip {
            pay_date: Some(pay_date.to_string()),
            period_end: None,
            gross: None,
            net: None,
            items: items
                .iter()
                .map(|(n, a)| PayItem {
                    job_number: n.to_string(),
                    description: "JOB".to_string(),
                    amount: *a,
                })
                .collect(),
        };
        insert_payslip(conn, &slip, import_id).unwrap();
    }

    #[test]
    fn test_reconcile_categories() {
        let (_dir, conn) = test_db();
        add_job(&conn, "2025-01-15", "100");
        add_job(&conn, "2025-01-15", "101");
        add_job(&conn, "2025-01-16", "102");
        add_job(&conn, "2025-01-16", "103");
        set_job_status(&conn, "2025-01-16", "102", JobStatus::Dnco).unwrap();
        set_job_status(&conn, "2025-01-16", "103", JobStatus::Dnco).unwrap();
        add_payslip(&conn, "2025-01-31", &[("100", 12.5), ("102", 8.0), ("999", 5.0)]);

        let report = reconcile(&conn, "2025-01-01", "2025-01-31").unwrap();
        let paid: Vec<&str> = report.paid.iter().map(|p| p.job.job_number.as_str()).collect();
        let unpaid: Vec<&str> = report.unpaid.iter().map(|j| j.job_number.as_str()).collect();
        assert_eq!(paid, vec!["100"]);
        assert_eq!(unpaid, vec!["101"]);
        assert_eq!(report.dnco_paid.len(), 1);
        assert_eq!(report.dnco_paid[0].job.job_number, "102");
        assert_eq!(report.unmatched_items.len(), 1);
        assert_eq!(report.unmatched_items[0].1.job_number, "999");
        assert_eq!(report.total_paid, 12.5);
    }

    #[test]
    fn test_payment_in_later_period_still_matches() {
        let (_dir, conn) = test_db();
        add_job(&conn, "2025-01-30", "200");
        add_payslip(&conn, "2025-02-28", &[("200", 10.0)]);
        let report = reconcile(&conn, "2025-01-01", "2025-01-31").unwrap();
        assert_eq!(report.paid.len(), 1);
        assert!(report.unmatched_items.is_empty());
    }

    #[test]
    fn test_split_payments_summed() {
        let (_dir, conn) = test_db();
        add_job(&conn, "2025-01-10", "300");
        add_payslip(&conn, "2025-01-31", &[("300", 10.0), ("300", 2.5)]);
        let report = reconcile(&conn, "2025-01-01", "2025-01-31").unwrap();
        assert_eq!(report.paid[0].amount, 12.5);
    }
}

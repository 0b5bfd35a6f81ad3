use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::models::{JobAudit, JobRecord, JobStatus, PayItem, Payslip, StoredJob};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    kind TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    job_number TEXT NOT NULL,
    customer TEXT,
    activity TEXT,
    priority TEXT,
    address TEXT NOT NULL DEFAULT '',
    postcode TEXT,
    status TEXT NOT NULL DEFAULT 'completed',
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (date, job_number),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS job_audit (
    id INTEGER PRIMARY KEY,
    job_id INTEGER NOT NULL,
    action TEXT NOT NULL,
    detail TEXT,
    at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (job_id) REFERENCES jobs(id)
);

CREATE TABLE IF NOT EXISTS payslips (
    id INTEGER PRIMARY KEY,
    pay_date TEXT,
    period_end TEXT,
    gross REAL,
    net REAL,
    import_id INTEGER,
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE TABLE IF NOT EXISTS payslip_items (
    id INTEGER PRIMARY KEY,
    payslip_id INTEGER NOT NULL,
    job_number TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    FOREIGN KEY (payslip_id) REFERENCES payslips(id)
);

CREATE INDEX IF NOT EXISTS idx_jobs_job_number ON jobs(job_number);
CREATE INDEX IF NOT EXISTS idx_payslip_items_job_number ON payslip_items(job_number);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn is_imported(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM imports WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

pub fn record_import(conn: &Connection, filename: &str, kind: &str, checksum: &str, count: usize) -> Result<i64> {
    conn.execute(
        "INSERT INTO imports (filename, kind, record_count, checksum) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![filename, kind, count as i64, checksum],
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

fn audit(conn: &Connection, job_id: i64, action: &str, detail: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO job_audit (job_id, action, detail) VALUES (?1, ?2, ?3)",
        rusqlite::params![job_id, action, detail],
    )?;
    Ok(())
}

/// Insert or update a job keyed by (date, job_number), writing an audit row
/// for every insert and for every update that changes a field.
pub fn upsert_job(conn: &Connection, date: &str, job: &JobRecord, import_id: Option<i64>) -> Result<Upsert> {
    let address = job.address();
    let existing: Option<(i64, Option<String>, Option<String>, Option<String>, String, Option<String>)> = conn
        .query_row(
            "SELECT id, customer, activity, priority, address, postcode FROM jobs WHERE date = ?1 AND job_number = ?2",
            rusqlite::params![date, job.job_number],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
        )
        .optional()?;

    let Some((id, customer, activity, priority, old_address, postcode)) = existing else {
        conn.execute(
            "INSERT INTO jobs (date, job_number, customer, activity, priority, address, postcode, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                date,
                job.job_number,
                job.customer,
                job.activity,
                job.priority,
                address,
                job.postcode,
                import_id
            ],
        )?;
        audit(conn, conn.last_insert_rowid(), "inserted", None)?;
        return Ok(Upsert::Inserted);
    };

    let mut changed = Vec::new();
    if customer != job.customer {
        changed.push("customer");
    }
    if activity != job.activity {
        changed.push("activity");
    }
    if priority != job.priority {
        changed.push("priority");
    }
    if old_address != address {
        changed.push("address");
    }
    if postcode != job.postcode {
        changed.push("postcode");
    }
    if changed.is_empty() {
        return Ok(Upsert::Unchanged);
    }

    conn.execute(
        "UPDATE jobs SET customer = ?1, activity = ?2, priority = ?3, address = ?4, postcode = ?5, \
         import_id = COALESCE(?6, import_id), updated_at = datetime('now') WHERE id = ?7",
        rusqlite::params![job.customer, job.activity, job.priority, address, job.postcode, import_id, id],
    )?;
    audit(conn, id, "updated", Some(&changed.join(", ")))?;
    Ok(Upsert::Updated)
}

pub fn set_job_status(conn: &Connection, date: &str, job_number: &str, status: JobStatus) -> Result<bool> {
    let (id, current): (i64, String) = conn
        .query_row(
            "SELECT id, status FROM jobs WHERE date = ?1 AND job_number = ?2",
            [date, job_number],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| LedgerError::UnknownJob {
            date: date.to_string(),
            job_number: job_number.to_string(),
        })?;
    if current == status.as_str() {
        return Ok(false);
    }
    conn.execute(
        "UPDATE jobs SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
        rusqlite::params![status.as_str(), id],
    )?;
    audit(conn, id, "status", Some(&format!("{current} -> {}", status.as_str())))?;
    Ok(true)
}

fn job_from_row(row: &rusqlite::Row) -> rusqlite::Result<StoredJob> {
    let status: String = row.get(8)?;
    Ok(StoredJob {
        id: row.get(0)?,
        date: row.get(1)?,
        job_number: row.get(2)?,
        customer: row.get(3)?,
        activity: row.get(4)?,
        priority: row.get(5)?,
        address: row.get(6)?,
        postcode: row.get(7)?,
        status: JobStatus::from_db(&status),
    })
}

const JOB_COLUMNS: &str = "id, date, job_number, customer, activity, priority, address, postcode, status";

pub fn jobs_between(conn: &Connection, from: &str, to: &str) -> Result<Vec<StoredJob>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE date BETWEEN ?1 AND ?2 ORDER BY date, job_number"
    ))?;
    let rows = stmt.query_map([from, to], job_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn job_history(conn: &Connection, job_number: &str) -> Result<Vec<JobAudit>> {
    let mut stmt = conn.prepare(
        "SELECT a.action, a.detail, a.at, j.date FROM job_audit a JOIN jobs j ON a.job_id = j.id \
         WHERE j.job_number = ?1 ORDER BY a.id",
    )?;
    let rows = stmt.query_map([job_number], |r| {
        Ok(JobAudit {
            action: r.get(0)?,
            detail: r.get(1)?,
            at: r.get(2)?,
            date: r.get(3)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn insert_payslip(conn: &Connection, slip: &Payslip, import_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO payslips (pay_date, period_end, gross, net, import_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![slip.pay_date, slip.period_end, slip.gross, slip.net, import_id],
    )?;
    let payslip_id = conn.last_insert_rowid();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO payslip_items (payslip_id, job_number, description, amount) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for item in &slip.items {
        stmt.execute(rusqlite::params![payslip_id, item.job_number, item.description, item.amount])?;
    }
    Ok(payslip_id)
}

pub struct PayslipSummary {
    pub id: i64,
    pub pay_date: Option<String>,
    pub gross: Option<f64>,
    pub net: Option<f64>,
    pub item_count: i64,
    pub items_total: f64,
}

pub fn list_payslips(conn: &Connection) -> Result<Vec<PayslipSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.pay_date, p.gross, p.net, count(i.id), COALESCE(SUM(i.amount), 0) \
         FROM payslips p LEFT JOIN payslip_items i ON i.payslip_id = p.id \
         GROUP BY p.id ORDER BY p.pay_date",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(PayslipSummary {
            id: r.get(0)?,
            pay_date: r.get(1)?,
            gross: r.get(2)?,
            net: r.get(3)?,
            item_count: r.get(4)?,
            items_total: r.get(5)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Every pay item with the pay date of its payslip, in job-number order.
pub fn all_pay_items(conn: &Connection) -> Result<Vec<(Option<String>, PayItem)>> {
    let mut stmt = conn.prepare(
        "SELECT p.pay_date, i.job_number, i.description, i.amount \
         FROM payslip_items i JOIN payslips p ON i.payslip_id = p.id ORDER BY i.job_number, p.pay_date",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get(0)?,
            PayItem {
                job_number: r.get(1)?,
                description: r.get(2)?,
                amount: r.get(3)?,
            },
        ))
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

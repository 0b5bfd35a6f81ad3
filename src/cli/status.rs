use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{db_path, load_settings, settings_path};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = db_path();

    println!("Settings:   {}", settings_path().display());
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;
        let jobs: i64 = conn.query_row("SELECT count(*) FROM jobs", [], |r| r.get(0))?;
        let dnco: i64 = conn.query_row("SELECT count(*) FROM jobs WHERE status = 'dnco'", [], |r| r.get(0))?;
        let payslips: i64 = conn.query_row("SELECT count(*) FROM payslips", [], |r| r.get(0))?;
        let range: (Option<String>, Option<String>) =
            conn.query_row("SELECT min(date), max(date) FROM jobs", [], |r| Ok((r.get(0)?, r.get(1)?)))?;

        println!();
        println!("Imports:    {imports}");
        println!("Jobs:       {jobs}");
        println!("DNCO:       {dnco}");
        println!("Payslips:   {payslips}");
        if let (Some(first), Some(last)) = range {
            println!("Jobs from:  {first} to {last}");
        }
    } else {
        println!();
        println!("Database not found. Run `runledger init` to set up.");
    }

    Ok(())
}

use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::load_parser;
use crate::error::Result;
use crate::fmt::opt;
use crate::pdf::extract_document;
use crate::runsheet::{detect_runsheet_date, extract_jobs, Strategy};

pub fn run(file: &str, strategy: Strategy, json: bool) -> Result<()> {
    let path = Path::new(file);
    let parser = load_parser()?;
    let doc = extract_document(path)?;
    let date = detect_runsheet_date(doc.all_lines(), path);

    let mut pages = Vec::new();
    for page in &doc.pages {
        pages.push((page.number, extract_jobs(&parser, &page.lines, strategy)));
    }

    if json {
        let out = serde_json::json!({
            "file": file,
            "date": date.map(|d| d.format("%Y-%m-%d").to_string()),
            "pages": pages
                .iter()
                .map(|(number, jobs)| serde_json::json!({ "page": number, "jobs": jobs }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Page", "Job", "Customer", "Activity", "Priority", "Address", "Postcode"]);
    let mut count = 0usize;
    for (number, jobs) in &pages {
        for job in jobs {
            count += 1;
            table.add_row(vec![
                Cell::new(number),
                Cell::new(&job.job_number),
                Cell::new(opt(&job.customer)),
                Cell::new(opt(&job.activity)),
                Cell::new(opt(&job.priority)),
                Cell::new(job.address()),
                Cell::new(opt(&job.postcode)),
            ]);
        }
    }
    let date = date.map_or_else(|| "no date found".to_string(), |d| d.format("%Y-%m-%d").to_string());
    println!("{file} ({date}): {count} jobs\n{table}");
    Ok(())
}

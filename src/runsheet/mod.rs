pub mod config;
pub mod parser;
pub mod table;

use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::JobRecord;
pub use config::ParserConfig;
pub use parser::RunsheetJobParser;
pub use table::TableJobExtractor;

/// How a page is turned into jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    /// Table when the page has a recognisable header row, lines otherwise.
    #[default]
    Auto,
    Lines,
    Table,
}

/// Run the chosen strategy over one page.
pub fn extract_jobs<S: AsRef<str>>(
    parser: &RunsheetJobParser,
    lines: &[S],
    strategy: Strategy,
) -> Vec<JobRecord> {
    let tables = TableJobExtractor::new(parser);
    match strategy {
        Strategy::Lines => parser.parse(lines).collect(),
        Strategy::Table => tables.extract(lines),
        Strategy::Auto => match table::detect_layout(lines, &parser.config().table_headers) {
            Some(layout) => {
                tracing::debug!("table header detected, using table strategy");
                tables.extract_with(lines, &layout)
            }
            None => parser.parse(lines).collect(),
        },
    }
}

fn date_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:(\d{1,2})[/.](\d{1,2})[/.](\d{4})|(\d{4})-(\d{2})-(\d{2}))\b").unwrap()
    })
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap())
}

/// Parse a UK (`dd/mm/yyyy`, `dd.mm.yyyy`) or ISO date anywhere in `text`.
pub fn find_date(text: &str) -> Option<NaiveDate> {
    date_line_re().captures_iter(text).find_map(|c| {
        if let (Some(d), Some(m), Some(y)) = (c.get(1), c.get(2), c.get(3)) {
            NaiveDate::from_ymd_opt(y.as_str().parse().ok()?, m.as_str().parse().ok()?, d.as_str().parse().ok()?)
        } else {
            NaiveDate::from_ymd_opt(c[4].parse().ok()?, c[5].parse().ok()?, c[6].parse().ok()?)
        }
    })
}

/// The runsheet's working date: a date on a line mentioning `Date`, then an
/// ISO date in the file name.
pub fn detect_runsheet_date<'a>(lines: impl IntoIterator<Item = &'a str>, path: &Path) -> Option<NaiveDate> {
    lines
        .into_iter()
        .filter(|l| l.to_ascii_lowercase().contains("date"))
        .find_map(find_date)
        .or_else(|| {
            let name = path.file_name()?.to_str()?;
            let c = iso_date_re().captures(name)?;
            NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RunsheetJobParser {
        RunsheetJobParser::new(&ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_auto_picks_lines_for_flow_text() {
        let lines = ["Job # 4285671", "Acme Corp", "4HR", "12 High Street", "LONDON EC1A 1BB"];
        let jobs = extract_jobs(&parser(), &lines, Strategy::Auto);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].address_lines, vec!["12 High Street".to_string()]);
    }

    #[test]
    fn test_auto_picks_table_for_header_row() {
        let lines = ["Job No\tCustomer\tActivity", "123456\tAcme\tINSTALL"];
        let jobs = extract_jobs(&parser(), &lines, Strategy::Auto);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].customer.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_forced_lines_ignores_table() {
        let lines = ["Job No\tCustomer\tActivity", "123456\tAcme\tINSTALL"];
        assert!(extract_jobs(&parser(), &lines, Strategy::Lines).is_empty());
    }

    #[test]
    fn test_find_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15);
        assert_eq!(find_date("Date: 15/01/2025"), expected);
        assert_eq!(find_date("Run date 15.01.2025"), expected);
        assert_eq!(find_date("2025-01-15"), expected);
        assert_eq!(find_date("31/02/2025"), None);
        assert_eq!(find_date("no date here"), None);
    }

    #[test]
    fn test_runsheet_date_from_lines_then_filename() {
        let lines = ["Runsheet", "Date: 03/02/2025", "Job # 1"];
        let date = detect_runsheet_date(lines, Path::new("sheet.pdf"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 2, 3));

        let lines = ["Runsheet", "Job # 1", "Ref 1: 12/12/2024"];
        let date = detect_runsheet_date(lines, Path::new("/tmp/runsheet-2025-03-04.pdf"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 4));

        assert_eq!(detect_runsheet_date(["Job # 1"], Path::new("sheet.pdf")), None);
    }
}

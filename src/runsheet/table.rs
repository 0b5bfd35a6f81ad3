//! Table strategy for runsheet pages that keep a real column layout.
//!
//! A header row naming at least three known columns (one of them the job
//! number) fixes the layout. Pipe- or tab-separated headers are split by
//! delimiter; anything else is sliced at the character offsets where each
//! header label starts, since flow text pads columns with spaces.

use crate::models::JobRecord;
use crate::runsheet::config::TableHeaders;
use crate::runsheet::parser::RunsheetJobParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    JobNumber,
    Customer,
    Activity,
    Priority,
    Address,
    Postcode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Split {
    Delimited(char),
    Positional(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableLayout {
    header_line: usize,
    columns: Vec<Option<Column>>,
    split: Split,
}

fn classify(label: &str, headers: &TableHeaders) -> Option<Column> {
    let label = label.trim().trim_end_matches(':');
    let hit = |names: &[String]| names.iter().any(|n| n.eq_ignore_ascii_case(label));
    if hit(&headers.job_number) {
        Some(Column::JobNumber)
    } else if hit(&headers.customer) {
        Some(Column::Customer)
    } else if hit(&headers.activity) {
        Some(Column::Activity)
    } else if hit(&headers.priority) {
        Some(Column::Priority)
    } else if hit(&headers.address) {
        Some(Column::Address)
    } else if hit(&headers.postcode) {
        Some(Column::Postcode)
    } else {
        None
    }
}

/// Cells separated by two or more spaces, with their starting char offsets.
fn space_cells(line: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut cells = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        let start = i;
        while i < chars.len() {
            let gap = chars[i].is_whitespace()
                && (chars[i] == '\t' || chars.get(i + 1).is_some_and(|c| c.is_whitespace()));
            if gap {
                break;
            }
            i += 1;
        }
        let text: String = chars[start..i].iter().collect();
        cells.push((start, text.trim().to_string()));
    }
    cells
}

fn delimiter_of(line: &str) -> Option<char> {
    if line.contains('|') {
        Some('|')
    } else if line.contains('\t') {
        Some('\t')
    } else {
        None
    }
}

/// Empty leading cells are kept for tabs; pipes may frame the row.
fn split_delimited(line: &str, delim: char) -> Vec<String> {
    let row = if delim == '\t' {
        line.trim_end_matches(['\r', '\n'])
    } else {
        line.trim().trim_matches(delim)
    };
    row.split(delim).map(|c| c.trim().to_string()).collect()
}

fn split_positional(line: &str, starts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(chars.len()).min(chars.len());
            if start < end {
                chars[start..end].iter().collect::<String>().trim().to_string()
            } else {
                String::new()
            }
        })
        .collect()
}

/// Locate the first header row on the page.
pub(crate) fn detect_layout<S: AsRef<str>>(lines: &[S], headers: &TableHeaders) -> Option<TableLayout> {
    for (idx, raw) in lines.iter().enumerate() {
        let line = raw.as_ref();
        let (labels, split) = match delimiter_of(line) {
            Some(d) => (split_delimited(line, d), Split::Delimited(d)),
            None => {
                let cells = space_cells(line);
                let starts = cells.iter().map(|(s, _)| *s).collect();
                (cells.into_iter().map(|(_, t)| t).collect(), Split::Positional(starts))
            }
        };
        let columns: Vec<Option<Column>> = labels.iter().map(|l| classify(l, headers)).collect();
        let known = columns.iter().flatten().count();
        if known >= 3 && columns.contains(&Some(Column::JobNumber)) {
            return Some(TableLayout {
                header_line: idx,
                columns,
                split,
            });
        }
    }
    None
}

pub struct TableJobExtractor<'a> {
    parser: &'a RunsheetJobParser,
}

impl<'a> TableJobExtractor<'a> {
    pub fn new(parser: &'a RunsheetJobParser) -> Self {
        Self { parser }
    }

    /// Returns an empty list when the page has no recognisable header row.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Vec<JobRecord> {
        match detect_layout(lines, &self.parser.config().table_headers) {
            Some(layout) => self.extract_with(lines, &layout),
            None => Vec::new(),
        }
    }

    pub(crate) fn extract_with<S: AsRef<str>>(&self, lines: &[S], layout: &TableLayout) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = Vec::new();
        for raw in &lines[layout.header_line + 1..] {
            let line = raw.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            let cells = match &layout.split {
                Split::Delimited(d) => split_delimited(line, *d),
                Split::Positional(starts) => split_positional(line, starts),
            };
            let cell = |col: Column| {
                layout
                    .columns
                    .iter()
                    .position(|c| *c == Some(col))
                    .and_then(|i| cells.get(i))
                    .map(String::as_str)
                    .unwrap_or("")
            };

            let job_number = cell(Column::JobNumber);
            if job_number.is_empty() {
                // Wrapped address cell continues the previous row.
                if let Some(prev) = jobs.last_mut() {
                    let extra = cell(Column::Address);
                    if !extra.is_empty() && prev.postcode.is_none() {
                        self.fill_address(prev, extra);
                    }
                }
                continue;
            }
            if !job_number.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            let mut job = JobRecord {
                job_number: job_number.to_string(),
                ..Default::default()
            };
            let customer = cell(Column::Customer);
            if !customer.is_empty() {
                job.customer = Some(customer.to_string());
            }
            let activity = cell(Column::Activity);
            if self.parser.config().activity_codes.iter().any(|a| a == activity) {
                job.activity = Some(activity.to_string());
            }
            job.priority = self.parser.find_priority(cell(Column::Priority));
            if let Some((_, postcode)) = self.parser.split_postcode(cell(Column::Postcode)) {
                job.postcode = Some(postcode);
            }
            self.fill_address(&mut job, cell(Column::Address));
            jobs.push(job);
        }
        jobs
    }

    fn fill_address(&self, job: &mut JobRecord, cell: &str) {
        for part in cell.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if job.postcode.is_none() {
                if let Some((rest, postcode)) = self.parser.split_postcode(part) {
                    if !rest.is_empty() {
                        job.address_lines.push(rest);
                    }
                    job.postcode = Some(postcode);
                    continue;
                }
            }
            job.address_lines.push(part.to_string());
        }
    }
}

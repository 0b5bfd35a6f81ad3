use regex::Regex;

use crate::error::{LedgerError, Result};
use crate::models::JobRecord;
use crate::runsheet::config::{starts_with_any, ParserConfig};

/// Line-oriented heuristic parser for runsheet pages.
///
/// Each job marker opens a window of at most `lookahead` lines (cut short by
/// the next marker). Lines in the window go through a fixed rule order and
/// the first rule that claims a line wins.
#[derive(Debug, Clone)]
pub struct RunsheetJobParser {
    job_marker: Regex,
    priority: Regex,
    postcode: Regex,
    contact_name: Option<Regex>,
    config: ParserConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Preamble,
    Address,
    Done,
}

impl RunsheetJobParser {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let job_marker = Regex::new(&config.job_marker_pattern)?;
        if job_marker.captures_len() != 2 {
            return Err(LedgerError::Config(
                "job_marker_pattern needs exactly one capture group".to_string(),
            ));
        }
        let postcode = Regex::new(&config.postcode_pattern)?;
        if postcode.captures_len() != 3 {
            return Err(LedgerError::Config(
                "postcode_pattern needs two capture groups (outward, inward)".to_string(),
            ));
        }
        if config.lookahead == 0 {
            return Err(LedgerError::Config("lookahead must be at least 1".to_string()));
        }
        let roles: Vec<String> = config.contact_roles.iter().map(|r| regex::escape(r)).collect();
        let contact_name = if roles.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"(?i)^\d+\s+.*\b(?:{})\b", roles.join("|")))?)
        };
        Ok(Self {
            job_marker,
            priority: Regex::new(&config.priority_pattern)?,
            postcode,
            contact_name,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Lazily parse `lines`. Single forward pass; call again to re-parse.
    pub fn parse<'a, S: AsRef<str>>(&'a self, lines: &'a [S]) -> Jobs<'a, S> {
        Jobs {
            parser: self,
            lines,
            pos: 0,
        }
    }

    pub(crate) fn job_number(&self, line: &str) -> Option<String> {
        self.job_marker
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub(crate) fn find_priority(&self, line: &str) -> Option<String> {
        self.priority.find(line).map(|m| m.as_str().to_string())
    }

    /// Split a line into (text without postcode, normalised postcode).
    pub(crate) fn split_postcode(&self, line: &str) -> Option<(String, String)> {
        let caps = self.postcode.captures(line)?;
        let whole = caps.get(0)?;
        let postcode = format!("{} {}", &caps[1], &caps[2]);
        let rest = format!("{} {}", &line[..whole.start()], &line[whole.end()..]);
        let rest = rest
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string();
        Some((rest, postcode))
    }

    fn is_contact_name(&self, line: &str) -> bool {
        self.contact_name.as_ref().is_some_and(|re| re.is_match(line))
    }

    fn is_address_text(&self, line: &str) -> bool {
        line.chars().count() > self.config.min_address_len
            && !line.chars().all(|c| c.is_ascii_digit() || c.is_whitespace())
    }

    /// Parse one window. `window[0]` is the marker line.
    fn parse_window<S: AsRef<str>>(&self, window: &[S]) -> Option<JobRecord> {
        let job_number = window.first().and_then(|l| self.job_number(l.as_ref()))?;
        if job_number.is_empty() || !job_number.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let mut job = JobRecord {
            job_number,
            ..Default::default()
        };
        let mut phase = Phase::Preamble;

        for raw in &window[1..] {
            let line = raw.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if self.is_contact_name(line) {
                continue;
            }
            if self.config.activity_codes.iter().any(|a| a == line) {
                if job.activity.is_none() {
                    job.activity = Some(line.to_string());
                }
                continue;
            }
            if let Some(priority) = self.find_priority(line) {
                if job.priority.is_none() {
                    job.priority = Some(priority);
                }
                if phase == Phase::Preamble {
                    phase = Phase::Address;
                }
                continue;
            }
            if starts_with_any(line, &self.config.address_triggers) {
                if phase == Phase::Preamble {
                    phase = Phase::Address;
                }
                continue;
            }
            if starts_with_any(line, &self.config.stop_markers) {
                if phase == Phase::Address {
                    phase = Phase::Done;
                }
                continue;
            }
            match phase {
                Phase::Preamble => {
                    // First sensible line is the customer. Known to be fuzzy.
                    if job.customer.is_none() && !starts_with_any(line, &self.config.keyword_prefixes) {
                        job.customer = Some(line.to_string());
                    }
                }
                Phase::Address => {
                    if let Some((rest, postcode)) = self.split_postcode(line) {
                        if self.is_address_text(&rest) {
                            job.address_lines.push(rest);
                        }
                        job.postcode = Some(postcode);
                        phase = Phase::Done;
                    } else if self.is_address_text(line) {
                        job.address_lines.push(line.to_string());
                    }
                }
                Phase::Done => {}
            }
        }
        Some(job)
    }
}

/// Iterator returned by [`RunsheetJobParser::parse`].
pub struct Jobs<'a, S> {
    parser: &'a RunsheetJobParser,
    lines: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> Iterator for Jobs<'a, S> {
    type Item = JobRecord;

    fn next(&mut self) -> Option<JobRecord> {
        while self.pos < self.lines.len() {
            let start = self.pos;
            if self.parser.job_number(self.lines[start].as_ref()).is_none() {
                self.pos += 1;
                continue;
            }
            let limit = (start + 1 + self.parser.config.lookahead).min(self.lines.len());
            let end = (start + 1..limit)
                .find(|&i| self.parser.job_number(self.lines[i].as_ref()).is_some())
                .unwrap_or(limit);
            self.pos = end;
            match self.parser.parse_window(&self.lines[start..end]) {
                Some(job) => return Some(job),
                None => tracing::debug!(line = start + 1, "discarded runsheet window without job number"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RunsheetJobParser {
        RunsheetJobParser::new(&ParserConfig::default()).unwrap()
    }

    fn parse_all(lines: &[&str]) -> Vec<JobRecord> {
        parser().parse(lines).collect()
    }

    const SCENARIO: &[&str] = &[
        "Job # 4285671",
        "Acme Corp",
        "SLA Window 4HR",
        "TECH EXCHANGE",
        "Ref 1: 99",
        "12 High Street",
        "LONDON EC1A 1BB",
        "Instructions: ring bell",
    ];

    #[test]
    fn test_end_to_end_scenario() {
        let jobs = parse_all(SCENARIO);
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.job_number, "4285671");
        assert_eq!(job.customer.as_deref(), Some("Acme Corp"));
        assert_eq!(job.activity.as_deref(), Some("TECH EXCHANGE"));
        assert_eq!(job.priority.as_deref(), Some("4HR"));
        assert_eq!(job.address_lines, vec!["12 High Street".to_string()]);
        assert_eq!(job.postcode.as_deref(), Some("EC1A 1BB"));
    }

    #[test]
    fn test_no_marker_yields_nothing() {
        let jobs = parse_all(&["Acme Corp", "12 High Street", "LONDON EC1A 1BB", "TECH EXCHANGE"]);
        assert!(jobs.is_empty());
        assert!(parse_all(&[]).is_empty());
    }

    #[test]
    fn test_job_numbers_are_digits() {
        let jobs = parse_all(&[
            "Job No. 100234",
            "Widgets Ltd",
            "JOB NUMBER: 100235",
            "Job: 100236",
            "Job Notes: none",
        ]);
        let numbers: Vec<&str> = jobs.iter().map(|j| j.job_number.as_str()).collect();
        assert_eq!(numbers, vec!["100234", "100235", "100236"]);
        for job in &jobs {
            assert!(!job.job_number.is_empty());
            assert!(job.job_number.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_contact_name_never_customer_or_address() {
        let jobs = parse_all(&[
            "Job # 555001",
            "12345 Area Manager",
            "Bright Dental",
            "8HR",
            "12345 Area Manager",
            "Unit 4 Mill Lane",
            "LEEDS LS1 4AP",
        ]);
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.customer.as_deref(), Some("Bright Dental"));
        assert_eq!(job.address_lines, vec!["Unit 4 Mill Lane".to_string()]);
        assert!(!job.address_lines.iter().any(|l| l.contains("Manager")));
    }

    #[test]
    fn test_postcode_removed_from_fragment() {
        let jobs = parse_all(&["Job # 1", "Shop", "4HR", "LONDON EC1A 1BB"]);
        assert_eq!(jobs[0].postcode.as_deref(), Some("EC1A 1BB"));
        assert!(jobs[0].address_lines.iter().all(|l| !l.contains("EC1A")));
    }

    #[test]
    fn test_long_fragment_kept_beside_postcode() {
        let jobs = parse_all(&["Job # 2", "Shop", "4HR", "Bramley Road, NEWCASTLE NE1 4ST"]);
        assert_eq!(jobs[0].address_lines, vec!["Bramley Road, NEWCASTLE".to_string()]);
        assert_eq!(jobs[0].postcode.as_deref(), Some("NE1 4ST"));
    }

    #[test]
    fn test_unspaced_postcode_normalised() {
        let jobs = parse_all(&["Job # 3", "Shop", "6HR", "SW1A2AA"]);
        assert_eq!(jobs[0].postcode.as_deref(), Some("SW1A 2AA"));
        assert!(jobs[0].address_lines.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let p = parser();
        let first: Vec<JobRecord> = p.parse(SCENARIO).collect();
        let second: Vec<JobRecord> = p.parse(SCENARIO).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_address_runs_to_window_end_without_postcode() {
        let jobs = parse_all(&[
            "Job # 700",
            "Corner Cafe",
            "ND 2",
            "The Old Barn",
            "Long Lane",
            "Little Snoring",
        ]);
        let job = &jobs[0];
        assert_eq!(job.priority.as_deref(), Some("ND 2"));
        assert_eq!(
            job.address_lines,
            vec!["The Old Barn".to_string(), "Long Lane".to_string(), "Little Snoring".to_string()]
        );
        assert!(job.postcode.is_none());
    }

    #[test]
    fn test_stop_marker_ends_address() {
        let jobs = parse_all(&[
            "Job # 701",
            "Corner Cafe",
            "No. of Parts: 2",
            "The Old Barn",
            "Job Notes",
            "Bring ladder please",
            "Returned Items: 1",
        ]);
        let job = &jobs[0];
        assert_eq!(job.address_lines, vec!["The Old Barn".to_string()]);
        assert!(job.priority.is_none());
    }

    #[test]
    fn test_no_address_before_trigger() {
        let jobs = parse_all(&["Job # 702", "Corner Cafe", "Preamble text line", "LONDON EC1A 1BB"]);
        let job = &jobs[0];
        assert_eq!(job.customer.as_deref(), Some("Corner Cafe"));
        assert!(job.address_lines.is_empty());
        assert!(job.postcode.is_none());
    }

    #[test]
    fn test_short_and_numeric_lines_skipped_in_address() {
        let jobs = parse_all(&["Job # 703", "Cafe", "4HR", "12", "1234567", "Flat 2", "Riverside Court"]);
        assert_eq!(jobs[0].address_lines, vec!["Riverside Court".to_string()]);
    }

    #[test]
    fn test_keyword_lines_not_customer() {
        let jobs = parse_all(&["Job # 704", "Tel: 0161 000000", "Date 01/02/2025", "Harbour Stores"]);
        assert_eq!(jobs[0].customer.as_deref(), Some("Harbour Stores"));
    }

    #[test]
    fn test_window_cut_by_next_marker() {
        let jobs = parse_all(&[
            "Job # 10",
            "First Customer",
            "Job # 11",
            "Second Customer",
            "COLLECTION",
        ]);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].customer.as_deref(), Some("First Customer"));
        assert!(jobs[0].activity.is_none());
        assert_eq!(jobs[1].customer.as_deref(), Some("Second Customer"));
        assert_eq!(jobs[1].activity.as_deref(), Some("COLLECTION"));
    }

    #[test]
    fn test_window_bounded_by_lookahead() {
        let config = ParserConfig {
            lookahead: 2,
            ..Default::default()
        };
        let p = RunsheetJobParser::new(&config).unwrap();
        let lines = ["Job # 20", "Customer A", "4HR", "Far Away Road", "DELIVERY"];
        let jobs: Vec<JobRecord> = p.parse(&lines).collect();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].priority.as_deref(), Some("4HR"));
        assert!(jobs[0].address_lines.is_empty());
        assert!(jobs[0].activity.is_none());
    }

    #[test]
    fn test_activity_requires_exact_line() {
        let jobs = parse_all(&["Job # 30", "Cafe", "TECH EXCHANGE REQUIRED"]);
        assert!(jobs[0].activity.is_none());
    }

    #[test]
    fn test_parser_is_lazy() {
        let p = parser();
        let lines = ["Job # 1", "A Customer", "Job # 2", "B Customer"];
        let mut jobs = p.parse(&lines);
        assert_eq!(jobs.next().map(|j| j.job_number), Some("1".to_string()));
        assert_eq!(jobs.next().map(|j| j.job_number), Some("2".to_string()));
        assert!(jobs.next().is_none());
    }

    #[test]
    fn test_config_with_custom_activity_list() {
        let config = ParserConfig {
            activity_codes: vec!["BOILER SERVICE".to_string()],
            ..Default::default()
        };
        let p = RunsheetJobParser::new(&config).unwrap();
        let lines = ["Job # 40", "Cafe", "BOILER SERVICE", "TECH EXCHANGE"];
        let jobs: Vec<JobRecord> = p.parse(&lines).collect();
        assert_eq!(jobs[0].activity.as_deref(), Some("BOILER SERVICE"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad_marker = ParserConfig {
            job_marker_pattern: r"Job (\d+) (\d+)".to_string(),
            ..Default::default()
        };
        assert!(matches!(RunsheetJobParser::new(&bad_marker), Err(LedgerError::Config(_))));
        let bad_regex = ParserConfig {
            priority_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(RunsheetJobParser::new(&bad_regex), Err(LedgerError::Regex(_))));
        let zero_window = ParserConfig {
            lookahead: 0,
            ..Default::default()
        };
        assert!(RunsheetJobParser::new(&zero_window).is_err());
    }

    #[test]
    fn test_custom_marker_with_non_digit_capture_discarded() {
        let config = ParserConfig {
            job_marker_pattern: r"(?i)^job\s*#\s*(\S+)".to_string(),
            ..Default::default()
        };
        let p = RunsheetJobParser::new(&config).unwrap();
        let lines = ["Job # ABC-12", "Acme", "Job # 900200", "Beta"];
        let jobs: Vec<JobRecord> = p.parse(&lines).collect();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_number, "900200");
        assert_eq!(jobs[0].customer.as_deref(), Some("Beta"));
    }
}

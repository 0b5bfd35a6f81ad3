use serde::{Deserialize, Serialize};

/// Everything the runsheet parsers treat as data: closed marker lists,
/// patterns and window bounds. Stored under `parser` in settings.json;
/// missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Lines after a job marker that belong to its window.
    pub lookahead: usize,
    /// Address lines must be longer than this many characters.
    pub min_address_len: usize,
    /// Must contain exactly one capture group: the numeric job id.
    pub job_marker_pattern: String,
    pub priority_pattern: String,
    /// Two capture groups: outward and inward code.
    pub postcode_pattern: String,
    pub contact_roles: Vec<String>,
    pub activity_codes: Vec<String>,
    pub address_triggers: Vec<String>,
    pub stop_markers: Vec<String>,
    pub keyword_prefixes: Vec<String>,
    pub table_headers: TableHeaders,
}

/// Header labels recognised by the table strategy, per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableHeaders {
    pub job_number: Vec<String>,
    pub customer: Vec<String>,
    pub activity: Vec<String>,
    pub priority: Vec<String>,
    pub address: Vec<String>,
    pub postcode: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            lookahead: 40,
            min_address_len: 6,
            job_marker_pattern: r"(?i)^\s*job\s*(?:#|no\.?|number|:)\s*:?\s*(\d+)\b".to_string(),
            priority_pattern: r"\b(4HR|6HR|8HR|ND\s*\d+)\b".to_string(),
            postcode_pattern: r"\b([A-Z]{1,2}[0-9][A-Z0-9]?)\s*([0-9][A-Z]{2})\b".to_string(),
            contact_roles: strings(&[
                "Manager",
                "Engineer",
                "Supervisor",
                "Coordinator",
                "Technician",
                "Director",
                "Officer",
                "Contact",
            ]),
            activity_codes: strings(&[
                "TECH EXCHANGE",
                "REPAIR WITH PARTS",
                "REPAIR WITHOUT PARTS",
                "COLLECTION",
                "DELIVERY",
                "INSTALL",
                "DE-INSTALL",
                "SITE SURVEY",
                "SWAP OUT",
            ]),
            address_triggers: strings(&["Ref 1", "Ref 2", "No. of Parts"]),
            stop_markers: strings(&[
                "Instructions",
                "Job Notes",
                "In Items",
                "Request",
                "Returned Items",
            ]),
            keyword_prefixes: strings(&[
                "Job",
                "SLA",
                "Ref",
                "Tel",
                "Phone",
                "Contact",
                "Date",
                "Time",
                "Page",
                "Status",
                "Priority",
                "Engineer",
                "Depot",
            ]),
            table_headers: TableHeaders::default(),
        }
    }
}

impl Default for TableHeaders {
    fn default() -> Self {
        Self {
            job_number: strings(&["Job No", "Job Number", "Job #", "Job"]),
            customer: strings(&["Customer", "Client", "Site"]),
            activity: strings(&["Activity", "Job Type"]),
            priority: strings(&["Priority", "SLA"]),
            address: strings(&["Address"]),
            postcode: strings(&["Postcode", "Post Code"]),
        }
    }
}

/// Case-insensitive prefix test used for every marker list. The prefix must
/// end on a word boundary, so `Job` does not match `Jobson Ltd`.
pub(crate) fn starts_with_any(line: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| {
        line.len() >= p.len()
            && line.is_char_boundary(p.len())
            && line[..p.len()].eq_ignore_ascii_case(p)
            && !line[p.len()..]
                .chars()
                .next()
                .is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_merges_with_defaults() {
        let json = r#"{"lookahead": 12, "stop_markers": ["Notes"]}"#;
        let cfg: ParserConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.lookahead, 12);
        assert_eq!(cfg.stop_markers, vec!["Notes".to_string()]);
        assert_eq!(cfg.min_address_len, 6);
        assert!(cfg.activity_codes.contains(&"TECH EXCHANGE".to_string()));
        assert!(cfg.table_headers.postcode.contains(&"Postcode".to_string()));
    }

    #[test]
    fn test_starts_with_any_ignores_case() {
        let prefixes = strings(&["Job Notes", "Ref 1"]);
        assert!(starts_with_any("JOB NOTES: call first", &prefixes));
        assert!(starts_with_any("ref 1: 99", &prefixes));
        assert!(!starts_with_any("Ref", &prefixes));
        assert!(!starts_with_any("12 High Street", &prefixes));
    }

    #[test]
    fn test_starts_with_any_needs_word_boundary() {
        let prefixes = strings(&["Job"]);
        assert!(starts_with_any("Job # 12", &prefixes));
        assert!(starts_with_any("Job", &prefixes));
        assert!(!starts_with_any("Jobson Ltd", &prefixes));
    }

    #[test]
    fn test_starts_with_any_multibyte_line() {
        let prefixes = strings(&["Ref 1"]);
        assert!(!starts_with_any("£1 2345", &prefixes));
    }
}

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{PayItem, Payslip};
use crate::runsheet::find_date;

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace([',', '£', '"'], "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

fn item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d{5,})\s+(.+?)\s+(\(?-?£?-?[\d,]+\.\d{2}\)?)\s*$").unwrap()
    })
}

fn labelled_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\(?-?£?-?[\d,]+\.\d{2}\)?)").unwrap())
}

fn label_value<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    let lower = line.to_ascii_lowercase();
    labels.iter().find_map(|label| {
        let idx = lower.find(label)?;
        line.get(idx + label.len()..)
    })
}

/// Pull pay date, period end, totals and per-job items out of payslip text.
/// Fields that cannot be found stay `None`; item lines need a job number of
/// at least five digits followed by a description and an amount.
pub fn parse_payslip<'a>(lines: impl IntoIterator<Item = &'a str>) -> Payslip {
    let mut slip = Payslip {
        pay_date: None,
        period_end: None,
        gross: None,
        net: None,
        items: Vec::new(),
    };

    for line in lines {
        if let Some(caps) = item_re().captures(line) {
            if let Some(amount) = parse_amount(&caps[3]) {
                slip.items.push(PayItem {
                    job_number: caps[1].to_string(),
                    description: caps[2].trim().to_string(),
                    amount,
                });
                continue;
            }
        }
        if slip.pay_date.is_none() {
            if let Some(rest) = label_value(line, &["pay date", "payment date"]) {
                slip.pay_date = find_date(rest).map(|d| d.format("%Y-%m-%d").to_string());
                continue;
            }
        }
        if slip.period_end.is_none() {
            if let Some(rest) = label_value(line, &["period ending", "period end"]) {
                slip.period_end = find_date(rest).map(|d| d.format("%Y-%m-%d").to_string());
                continue;
            }
        }
        if slip.gross.is_none() {
            if let Some(rest) = label_value(line, &["gross pay", "total gross"]) {
                slip.gross = labelled_amount_re()
                    .find(rest)
                    .and_then(|m| parse_amount(m.as_str()));
                continue;
            }
        }
        if slip.net.is_none() {
            if let Some(rest) = label_value(line, &["net pay", "total net"]) {
                slip.net = labelled_amount_re()
                    .find(rest)
                    .and_then(|m| parse_amount(m.as_str()));
            }
        }
    }
    slip
}

impl Payslip {
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(|i| i.amount).sum()
    }
}

//! Month names, quarter labels and the date formats the profiler recognises.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Share of values that must match before a column counts as a month or quarter axis.
const AXIS_MATCH_RATIO: f64 = 0.8;

static MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        // French, full names with and without accents
        ("janvier", 1), ("fevrier", 2), ("février", 2), ("mars", 3), ("avril", 4),
        ("mai", 5), ("juin", 6), ("juillet", 7), ("aout", 8), ("août", 8),
        ("septembre", 9), ("octobre", 10), ("novembre", 11), ("decembre", 12), ("décembre", 12),
        // French abbreviations
        ("jan", 1), ("fev", 2), ("fév", 2), ("mar", 3), ("avr", 4), ("jun", 6),
        ("jul", 7), ("aou", 8), ("sep", 9), ("oct", 10), ("nov", 11), ("dec", 12), ("déc", 12),
        // English
        ("january", 1), ("february", 2), ("march", 3), ("april", 4), ("may", 5), ("june", 6),
        ("july", 7), ("august", 8), ("september", 9), ("october", 10), ("november", 11),
        ("december", 12),
    ]
    .into_iter()
    .collect()
});

static QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[qt][1-4](?:\s*\d{4})?$").expect("quarter pattern is valid"));

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Calendar index of a lower-cased month name.
pub fn month_index(label: &str) -> Option<u32> {
    MONTHS.get(label).copied()
}

pub fn is_quarter_label(label: &str) -> bool {
    QUARTER.is_match(label)
}

/// At least two labels must be month names, and more than 80% of all labels.
pub fn is_month_axis(labels: &[String]) -> bool {
    dominant_match(labels, |label| month_index(label).is_some())
}

pub fn is_quarter_axis(labels: &[String]) -> bool {
    dominant_match(labels, is_quarter_label)
}

fn dominant_match(labels: &[String], matches: impl Fn(&str) -> bool) -> bool {
    if labels.is_empty() {
        return false;
    }
    let hits = labels.iter().filter(|label| matches(label.as_str())).count();
    hits >= 2 && hits as f64 / labels.len() as f64 > AXIS_MATCH_RATIO
}

/// Parse a date or timestamp written in one of the common spreadsheet forms.
/// Bare integers are never dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() || s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return date.and_hms_opt(0, 0, 0);
    }

    // "2024-03": a month written in ISO form
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        return NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0));
    }

    None
}

pub fn calendar_day(timestamp: &NaiveDateTime) -> String {
    timestamp.date().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_month_lookup() {
        assert_eq!(month_index("janvier"), Some(1));
        assert_eq!(month_index("février"), Some(2));
        assert_eq!(month_index("fevrier"), Some(2));
        assert_eq!(month_index("may"), Some(5));
        assert_eq!(month_index("déc"), Some(12));
        assert_eq!(month_index("Janvier"), None);
        assert_eq!(month_index("nord"), None);
    }

    #[test]
    fn test_month_axis_needs_two_matches_and_majority() {
        assert!(is_month_axis(&labels(&["janvier", "fevrier"])));
        assert!(!is_month_axis(&labels(&["janvier"])));
        assert!(!is_month_axis(&labels(&["janvier", "fevrier", "nord", "sud"])));
        // 5 of 6 is above 80%
        assert!(is_month_axis(&labels(&["jan", "fev", "mar", "avr", "mai", "total"])));
        // 4 of 5 is exactly 80%, not above
        assert!(!is_month_axis(&labels(&["jan", "fev", "mar", "avr", "total"])));
    }

    #[test]
    fn test_quarter_labels() {
        assert!(is_quarter_label("q1"));
        assert!(is_quarter_label("t4 2024"));
        assert!(is_quarter_label("q2 2023"));
        assert!(!is_quarter_label("q5"));
        assert!(!is_quarter_label("quarter 1"));
        assert!(is_quarter_axis(&labels(&["q1", "q2", "q3", "q4"])));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let day = |s: &str| parse_timestamp(s).map(|ts| calendar_day(&ts));
        assert_eq!(day("2024-01-15"), Some("2024-01-15".into()));
        assert_eq!(day("2024-01-15T10:30:00Z"), Some("2024-01-15".into()));
        assert_eq!(day("2024-01-15 10:30"), Some("2024-01-15".into()));
        assert_eq!(day("15/01/2024"), Some("2024-01-15".into()));
        assert_eq!(day("01/31/2024"), Some("2024-01-31".into()));
        assert_eq!(day("15.01.2024"), Some("2024-01-15".into()));
        assert_eq!(day("15 January 2024"), Some("2024-01-15".into()));
        assert_eq!(day("January 15, 2024"), Some("2024-01-15".into()));
        assert_eq!(day("2024-03"), Some("2024-03-01".into()));
    }

    #[test]
    fn test_parse_timestamp_rejects_plain_text_and_integers() {
        assert!(parse_timestamp("Nord").is_none());
        assert!(parse_timestamp("45000").is_none());
        assert!(parse_timestamp("Widget A").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("2024-13-01").is_none());
    }
}

//! Gmail search query construction
//!
//! Maps the gateway's small filter object onto Gmail search syntax.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

/// Results returned when the caller does not ask for a count
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Upper bound on messages fetched per search
pub const MAX_RESULTS_LIMIT: u32 = 25;

static GMAIL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}/(0?[1-9]|1[0-2])/(0?[1-9]|[12]\d|3[01])$").expect("date regex is valid")
});

/// Search filters accepted by the Gmail search endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub subject_contains: Option<String>,
    pub thread_contains: Option<String>,

    /// Raw Gmail search syntax, appended as-is
    pub query: Option<String>,

    pub after: Option<String>,
    pub before: Option<String>,

    #[serde(default)]
    pub include_body: bool,

    /// Number or numeric string
    #[serde(default, deserialize_with = "lenient_count")]
    pub max_results: Option<i64>,
}

impl SearchFilters {
    /// Requested result count, defaulted and clamped
    pub fn effective_max_results(&self) -> u32 {
        match self.max_results {
            Some(n) if n > 0 => n.min(MAX_RESULTS_LIMIT as i64) as u32,
            _ => DEFAULT_MAX_RESULTS,
        }
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// JSON-quote a value so Gmail treats it as a phrase
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// Build a Gmail search query from filters
///
/// The query always searches all mail (`in:anywhere`); every present filter
/// adds one space-separated term.
pub fn build_gmail_query(filters: &SearchFilters) -> String {
    let mut terms = vec!["in:anywhere".to_string()];

    if let Some(email) = present(&filters.from_email) {
        terms.push(format!("from:{}", quoted(email)));
    }
    // Display names are unreliable in headers; search them as free text.
    if let Some(name) = present(&filters.from_name) {
        terms.push(quoted(name));
    }
    if let Some(subject) = present(&filters.subject_contains) {
        terms.push(format!("subject:{}", quoted(subject)));
    }
    if let Some(text) = present(&filters.thread_contains) {
        terms.push(quoted(text));
    }
    if let Some(query) = present(&filters.query) {
        terms.push(query.to_string());
    }
    if let Some(date) = present(&filters.after).and_then(normalize_gmail_date) {
        terms.push(format!("after:{}", date));
    }
    if let Some(date) = present(&filters.before).and_then(normalize_gmail_date) {
        terms.push(format!("before:{}", date));
    }

    terms.join(" ")
}

/// Normalize a date to Gmail's `YYYY/MM/DD`
///
/// Input already in `YYYY/M/D` form is returned untouched.
pub fn normalize_gmail_date(input: &str) -> Option<String> {
    let input = input.trim();
    if GMAIL_DATE_RE.is_match(input) {
        return Some(input.to_string());
    }
    parse_utc(input).map(|dt| dt.format("%Y/%m/%d").to_string())
}

/// Parse an RFC 3339 timestamp, a naive date-time (as UTC) or a plain date
pub fn parse_utc(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters() {
        assert_eq!(build_gmail_query(&SearchFilters::default()), "in:anywhere");
    }

    #[test]
    fn test_all_filters_in_order() {
        let filters = SearchFilters {
            from_email: Some("boss@example.com".to_string()),
            from_name: Some("The Boss".to_string()),
            subject_contains: Some("quarterly report".to_string()),
            thread_contains: Some("budget".to_string()),
            query: Some("has:attachment".to_string()),
            after: Some("2024-01-15".to_string()),
            before: Some("2024/2/1".to_string()),
            ..Default::default()
        };

        assert_eq!(
            build_gmail_query(&filters),
            r#"in:anywhere from:"boss@example.com" "The Boss" subject:"quarterly report" "budget" has:attachment after:2024/01/15 before:2024/2/1"#
        );
    }

    #[test]
    fn test_values_are_json_quoted() {
        let filters = SearchFilters {
            subject_contains: Some(r#"say "hi""#.to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_gmail_query(&filters),
            r#"in:anywhere subject:"say \"hi\"""#
        );
    }

    #[test]
    fn test_empty_strings_are_ignored() {
        let filters = SearchFilters {
            from_email: Some(String::new()),
            query: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(build_gmail_query(&filters), "in:anywhere");
    }

    #[test]
    fn test_invalid_dates_are_dropped() {
        let filters = SearchFilters {
            after: Some("last tuesday".to_string()),
            before: Some("2024-03-01T10:00:00Z".to_string()),
            ..Default::default()
        };
        assert_eq!(build_gmail_query(&filters), "in:anywhere before:2024/03/01");
    }

    #[test]
    fn test_normalize_gmail_date() {
        assert_eq!(normalize_gmail_date("2024/03/09").as_deref(), Some("2024/03/09"));
        assert_eq!(normalize_gmail_date("2024/3/9").as_deref(), Some("2024/3/9"));
        assert_eq!(normalize_gmail_date("2024-03-09").as_deref(), Some("2024/03/09"));
        assert_eq!(
            normalize_gmail_date("2024-03-09T23:30:00-05:00").as_deref(),
            Some("2024/03/10")
        );
        assert_eq!(
            normalize_gmail_date("2024-03-09T08:15:00").as_deref(),
            Some("2024/03/09")
        );
        assert_eq!(normalize_gmail_date("2024/13/01"), None);
        assert_eq!(normalize_gmail_date("garbage"), None);
    }

    #[test]
    fn test_effective_max_results() {
        let with = |n: Option<i64>| SearchFilters {
            max_results: n,
            ..Default::default()
        };
        assert_eq!(with(None).effective_max_results(), 5);
        assert_eq!(with(Some(0)).effective_max_results(), 5);
        assert_eq!(with(Some(-3)).effective_max_results(), 5);
        assert_eq!(with(Some(10)).effective_max_results(), 10);
        assert_eq!(with(Some(500)).effective_max_results(), 25);
    }

    #[test]
    fn test_max_results_accepts_strings() {
        let filters: SearchFilters =
            serde_json::from_str(r#"{"maxResults": "12", "includeBody": true}"#).unwrap();
        assert_eq!(filters.effective_max_results(), 12);
        assert!(filters.include_body);

        let filters: SearchFilters = serde_json::from_str(r#"{"maxResults": "lots"}"#).unwrap();
        assert_eq!(filters.effective_max_results(), 5);
    }
}

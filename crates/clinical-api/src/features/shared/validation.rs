//! Input validation shared by feature routes and filters

use chrono::{DateTime, NaiveDate, Utc};

/// Treat `None`, `""` and whitespace-only strings alike as absent
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a date filter value.
///
/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date, which is read
/// as midnight UTC.
pub fn parse_date_bound(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

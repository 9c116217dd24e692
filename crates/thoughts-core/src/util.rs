//! Shared utility functions used across multiple modules.

use chrono::{DateTime, NaiveDate, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Today's date in UTC as `YYYY-MM-DD`.
pub fn today() -> String {
    date_key(Utc::now())
}

/// Calendar date (UTC) of an instant as `YYYY-MM-DD`.
pub fn date_key(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` date key.
pub fn parse_date_key(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()
}

/// 24-hour `HH:MM` of an instant, interpreted in UTC.
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" owner/notes ".to_string())),
            Some("owner/notes".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://api.github.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn date_and_time_use_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 23, 5, 59).unwrap();
        assert_eq!(date_key(instant), "2024-01-01");
        assert_eq!(format_time(instant), "23:05");
    }

    #[test]
    fn parse_date_key_rejects_garbage() {
        assert!(parse_date_key("2024-01-01").is_some());
        assert!(parse_date_key("yesterday").is_none());
    }
}

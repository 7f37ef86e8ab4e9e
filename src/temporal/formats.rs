//! Timestamp patterns and tolerant parsing.

use chrono::{NaiveDate, NaiveDateTime};

/// Candidate timestamp patterns, in detection order.
///
/// Detection picks the first pattern that clears the match threshold, so more
/// specific patterns precede their shorter prefixes. Zulu-suffixed values are
/// normalized to a `" UTC"` suffix before matching, which is why the ISO `Z`
/// forms appear here with a literal `UTC`.
pub const DATETIME_FORMATS: &[&str] = &[
    // ISO
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y%m%d%H%M%S",
    "%Y%m%d%H%M",
    // US
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%m-%d-%Y",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
    // European
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y",
    // Compact survey forms
    "%Y%m%d",
    "%d%m%Y",
    "%m%d%Y",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    // Month abbreviations
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d-%b-%Y",
    "%b-%d-%Y %H:%M:%S",
    "%b-%d-%Y %H:%M",
    "%b-%d-%Y",
    // GPS year + day-of-year
    "%Y-%j %H:%M:%S",
    "%Y-%j %H:%M",
    "%Y-%j",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%d",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y",
    // 12-hour clock
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    // UTC
    "%Y-%m-%d %H:%M:%S UTC",
    "%Y-%m-%d %H:%M UTC",
    "%Y-%m-%dT%H:%M:%S UTC",
    "%Y-%m-%dT%H:%M UTC",
];

/// Timestamp substituted for missing or unparseable values.
pub const MIN_TIMESTAMP: NaiveDateTime = NaiveDateTime::MIN;

/// Trims whitespace and rewrites a trailing `Z`/`z` as `" UTC"`.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        Some(rest) => format!("{rest} UTC"),
        None => trimmed.to_string(),
    }
}

/// Parses an already-normalized value. Date-only patterns resolve to midnight.
#[must_use]
pub fn parse_normalized(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format).ok().or_else(|| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Normalizes and parses a raw value.
#[must_use]
pub fn parse_timestamp(raw: &str, format: &str) -> Option<NaiveDateTime> {
    parse_normalized(&normalize(raw), format)
}

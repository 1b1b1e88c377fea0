//! Bill labels and timestamp parsing for Chamber open-data payloads.
//!
//! # Label format
//!
//! Bills are referred to by type acronym, number and year: `PL 1234/2023`,
//! `PEC 45/2019`, `MPV 1154/2023`. Missing parts are left out rather than
//! rendered as placeholders: a summary with no number yields `PL 2023`.
//!
//! # Timestamps
//!
//! The API emits local (Brasília) wall-clock times without an offset, with
//! or without seconds: `2023-03-01T10:24`, `2023-03-01T10:24:00`. Some
//! endpoints add fractional seconds or an explicit offset.

use chrono::{DateTime, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Build the short label for a bill.
///
/// ```
/// use legitrack_core::bill_label;
/// assert_eq!(bill_label(Some("PL"), Some(1234), Some(2023)), "PL 1234/2023");
/// ```
pub fn bill_label(acronym: Option<&str>, number: Option<i64>, year: Option<i64>) -> String {
    let acronym = acronym.map(str::trim).unwrap_or_default();
    let reference = match (number, year) {
        (Some(n), Some(y)) => format!("{n}/{y}"),
        (Some(n), None) => n.to_string(),
        (None, Some(y)) => y.to_string(),
        (None, None) => String::new(),
    };

    match (acronym.is_empty(), reference.is_empty()) {
        (false, false) => format!("{acronym} {reference}"),
        (false, true) => acronym.to_string(),
        (true, _) => reference,
    }
}

/// Parse a timestamp as emitted by the API. Offsets are dropped, keeping the
/// wall-clock time the API reported.
pub fn parse_api_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Render a stored timestamp the way the API responses expect.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

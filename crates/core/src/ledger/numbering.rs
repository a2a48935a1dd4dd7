//! Journal entry number formatting.
//!
//! Numbers look like `JE-2025-0042`. The period key is the year; sequence
//! values are allocated per period by the number generator.

use chrono::{Datelike, NaiveDate};

/// Prefix of every journal entry number.
pub const ENTRY_NUMBER_PREFIX: &str = "JE";

/// Returns the sequence period key for an accounting date.
#[must_use]
pub fn period_key(date: NaiveDate) -> String {
    date.year().to_string()
}

/// Formats an entry number, padding the sequence to at least four digits.
#[must_use]
pub fn format_entry_number(period_key: &str, sequence: i64) -> String {
    format!("{ENTRY_NUMBER_PREFIX}-{period_key}-{sequence:04}")
}

/// Splits an entry number into its period key and sequence value.
pub fn parse_entry_number(number: &str) -> Option<(String, i64)> {
    let mut parts = number.splitn(3, '-');
    if parts.next()? != ENTRY_NUMBER_PREFIX {
        return None;
    }
    let period = parts.next()?;
    let sequence = parts.next()?.parse::<i64>().ok()?;
    if period.is_empty() || sequence < 1 {
        return None;
    }
    Some((period.to_string(), sequence))
}

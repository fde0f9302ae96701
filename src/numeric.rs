//! # Numeric Normalizer
//!
//! Single source of truth for how a number is parsed out of tool output and how
//! it is displayed. Both renderers go through [`format`], so the text summary
//! and the HTML report can never disagree on a value's displayed form.
//!
//! ## Display Rules
//!
//! - **Count**: whole number (`60000`)
//! - **Rate / DurationMs / SizeMb / Seconds**: two decimals, with an all-zero
//!   fraction suppressed (`999.70`, `1000`, `307`)
//! - **Absent values** render as `N/A`, never as `0`
//!
//! ## Usage Examples
//!
//! ```rust
//! use kafka_perf_report::numeric::{format, parse_quantity, NumericKind};
//!
//! assert_eq!(format(999.7, NumericKind::Rate), "999.70");
//! assert_eq!(format(307.0, NumericKind::DurationMs), "307");
//! assert_eq!(parse_quantity("1,024.5 MB/sec").unwrap(), 1024.5);
//! ```

use thiserror::Error;

/// Placeholder for a value the run did not report
pub const NOT_AVAILABLE: &str = "N/A";

/// Semantic kind of a displayed number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// Record and message counts
    Count,
    /// Records/sec and MB/sec
    Rate,
    /// Latencies and other millisecond durations
    DurationMs,
    /// Data volumes in MB
    SizeMb,
    /// Wall-clock spans in seconds
    Seconds,
}

impl NumericKind {
    fn decimals(self) -> usize {
        match self {
            NumericKind::Count => 0,
            NumericKind::Rate
            | NumericKind::DurationMs
            | NumericKind::SizeMb
            | NumericKind::Seconds => 2,
        }
    }
}

/// Format a value in its canonical display form.
///
/// Pure: the same `(value, kind)` always yields the same string.
pub fn format(value: f64, kind: NumericKind) -> String {
    let decimals = kind.decimals();
    let formatted = format!("{:.*}", decimals, value);

    if decimals == 0 {
        return normalize_negative_zero(formatted);
    }

    let zero_fraction = format!(".{}", "0".repeat(decimals));
    match formatted.strip_suffix(zero_fraction.as_str()) {
        Some(whole) => normalize_negative_zero(whole.to_string()),
        None => formatted,
    }
}

/// Format an optional value, rendering absence as [`NOT_AVAILABLE`].
pub fn format_opt(value: Option<f64>, kind: NumericKind) -> String {
    value
        .map(|v| format(v, kind))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Format an optional count.
pub fn format_count(value: Option<u64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn normalize_negative_zero(s: String) -> String {
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

/// Format a volume given in MB with a unit that suits its magnitude
///
/// Below 0.001 MB the value is shown in bytes, below 1 MB in KB, and above
/// 1024 MB in GB or TB.
///
/// ```rust
/// # use kafka_perf_report::numeric::human_size_mb;
/// assert_eq!(human_size_mb(58.5938), "58.59 MB");
/// assert_eq!(human_size_mb(0.5), "512 KB");
/// assert_eq!(human_size_mb(2048.0), "2 GB");
/// ```
pub fn human_size_mb(mb: f64) -> String {
    if mb < 0.001 {
        format!("{} bytes", format(mb * 1024.0 * 1024.0, NumericKind::Count))
    } else if mb < 1.0 {
        format!("{} KB", format(mb * 1024.0, NumericKind::SizeMb))
    } else if mb < 1024.0 {
        format!("{} MB", format(mb, NumericKind::SizeMb))
    } else if mb < 1024.0 * 1024.0 {
        format!("{} GB", format(mb / 1024.0, NumericKind::SizeMb))
    } else {
        format!("{} TB", format(mb / (1024.0 * 1024.0), NumericKind::SizeMb))
    }
}

/// A labelled value that is not a usable number
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("empty value")]
    Empty,
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("'{0}' is negative")]
    Negative(String),
    #[error("'{0}' is not finite")]
    NotFinite(String),
    #[error("'{0}' is not a timestamp")]
    NotTimestamp(String),
}

/// Parse a quantity such as `1,024.5 MB/sec`, `8ms` or `60000`.
///
/// Thousands separators and a trailing unit suffix are stripped before
/// conversion. Negative and non-finite values are rejected.
pub fn parse_quantity(raw: &str) -> Result<f64, ValueError> {
    let trimmed = raw.trim().trim_end_matches(&['.', ')'][..]);
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }

    let numeric_end = trimmed
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+')))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(numeric_end);

    if !unit.trim().chars().all(is_unit_char) {
        return Err(ValueError::NotNumeric(raw.trim().to_string()));
    }

    let cleaned: String = number.chars().filter(|&c| c != ',').collect();
    if cleaned.is_empty() {
        return Err(ValueError::NotNumeric(raw.trim().to_string()));
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| ValueError::NotNumeric(raw.trim().to_string()))?;

    if !value.is_finite() {
        return Err(ValueError::NotFinite(raw.trim().to_string()));
    }
    if value < 0.0 {
        return Err(ValueError::Negative(raw.trim().to_string()));
    }

    // -0.0 parses fine but would render as "-0"
    Ok(value.abs())
}

/// Parse a whole-number count; fractional counts are rejected.
pub fn parse_count(raw: &str) -> Result<u64, ValueError> {
    let value = parse_quantity(raw)?;
    if value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(ValueError::NotNumeric(raw.trim().to_string()));
    }
    Ok(value as u64)
}

fn is_unit_char(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '/' | '%' | '.' | ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_keeps_two_decimals() {
        assert_eq!(format(999.7, NumericKind::Rate), "999.70");
        assert_eq!(format(0.98, NumericKind::Rate), "0.98");
        assert_eq!(format(0.9681, NumericKind::Rate), "0.97");
    }

    #[test]
    fn test_zero_fraction_is_suppressed() {
        assert_eq!(format(1000.0, NumericKind::Rate), "1000");
        assert_eq!(format(307.0, NumericKind::DurationMs), "307");
        assert_eq!(format(999.999, NumericKind::Rate), "1000");
        assert_eq!(format(0.0, NumericKind::SizeMb), "0");
    }

    #[test]
    fn test_durations_keep_reported_fraction() {
        assert_eq!(format(7.9, NumericKind::DurationMs), "7.90");
        assert_eq!(format(8.0, NumericKind::DurationMs), "8");
    }

    #[test]
    fn test_count_is_whole() {
        assert_eq!(format(60000.0, NumericKind::Count), "60000");
        assert_eq!(format_count(Some(42)), "42");
        assert_eq!(format_count(None), NOT_AVAILABLE);
        assert_eq!(format_count(Some(u64::MAX)), "18446744073709551615");
        assert_eq!(format_count(Some((1 << 53) + 1)), "9007199254740993");
    }

    #[test]
    fn test_absent_is_not_zero() {
        assert_eq!(format_opt(None, NumericKind::Rate), "N/A");
        assert_eq!(format_opt(Some(0.0), NumericKind::Rate), "0");
    }

    #[test]
    fn test_format_is_stable() {
        for &value in &[0.1, 1.005, 123.456, 1e9, 3.0] {
            assert_eq!(
                format(value, NumericKind::Rate),
                format(value, NumericKind::Rate)
            );
        }
    }

    #[test]
    fn test_human_size_mb() {
        assert_eq!(human_size_mb(0.0005), "524 bytes");
        assert_eq!(human_size_mb(0.25), "256 KB");
        assert_eq!(human_size_mb(58.5938), "58.59 MB");
        assert_eq!(human_size_mb(1536.0), "1.50 GB");
        assert_eq!(human_size_mb(2.0 * 1024.0 * 1024.0), "2 TB");
    }

    #[test]
    fn test_parse_quantity_strips_units_and_separators() {
        assert_eq!(parse_quantity("999.70 records/sec").unwrap(), 999.7);
        assert_eq!(parse_quantity("0.98 MB/sec").unwrap(), 0.98);
        assert_eq!(parse_quantity("8ms").unwrap(), 8.0);
        assert_eq!(parse_quantity("1,234,567").unwrap(), 1234567.0);
        assert_eq!(parse_quantity(" 44 ms. ").unwrap(), 44.0);
        assert_eq!(parse_quantity("12.5%").unwrap(), 12.5);
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert_eq!(parse_quantity(""), Err(ValueError::Empty));
        assert!(matches!(parse_quantity("n/a"), Err(ValueError::NotNumeric(_))));
        assert!(matches!(parse_quantity("12abc34"), Err(ValueError::NotNumeric(_))));
        assert!(matches!(parse_quantity("-5 ms"), Err(ValueError::Negative(_))));
        assert!(matches!(parse_quantity("1.2.3"), Err(ValueError::NotNumeric(_))));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("60,000").unwrap(), 60000);
        assert_eq!(parse_count("60000 records").unwrap(), 60000);
        assert!(parse_count("1.5").is_err());
    }
}

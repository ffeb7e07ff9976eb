//! Canonicalization of the loosely-typed cell values that arrive from
//! spreadsheets and OCR extraction: amounts, confidences, dates and
//! descriptions.
//!
//! Everything here is pure. Unparseable input yields `None`; callers must
//! treat that as a hard skip rather than substituting zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

/// Currency symbols stripped before amount parsing.
const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// Date formats accepted from sheet cells, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses an amount from a cell value, stripping currency symbols and
/// group separators. A single trailing comma group of one or two digits is
/// taken as a decimal separator, so `"12,50"` parses the same as `"12.50"`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    lazy_static! {
        static ref COMMA_DECIMAL_RX: Regex = Regex::new(r"^[^,]*,\d{1,2}$").unwrap();
    }

    let mut s: String = raw
        .trim()
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }

    if s.contains(',') && s.contains('.') {
        // Whichever separator comes last is the decimal point.
        if s.rfind(',') > s.rfind('.') {
            s.retain(|c| c != '.');
            s = s.replace(',', ".");
        } else {
            s.retain(|c| c != ',');
        }
    } else if s.contains(',') {
        if COMMA_DECIMAL_RX.is_match(&s) {
            s = s.replace(',', ".");
        } else {
            s.retain(|c| c != ',');
        }
    }

    s.parse().ok()
}

/// Normalizes a raw confidence value to `[0, 1]`, treating values above 1
/// as whole-number percentages.
pub fn normalize_confidence(raw: f64) -> f64 {
    let v = if raw > 1.0 { raw / 100.0 } else { raw };
    v.clamp(0.0, 1.0)
}

/// Parses a confidence cell: `"85%"`, `"0.85"` or `"85"` all become 0.85.
pub fn parse_confidence(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let (s, forced_percent) = match s.strip_suffix('%') {
        Some(rest) => (rest.trim(), true),
        None => (s, false),
    };
    let v: f64 = s.parse().ok()?;
    if forced_percent {
        Some((v / 100.0).clamp(0.0, 1.0))
    } else {
        Some(normalize_confidence(v))
    }
}

/// Parses a calendar date cell. Timestamps are accepted and truncated to
/// their date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    parse_timestamp(s).map(|ts| ts.date_naive())
}

/// Parses an RFC 3339 timestamp cell, also accepting the space-separated
/// form sheets tend to produce (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Lowercases and collapses whitespace in a free-text description.
pub fn normalize_description(raw: &str) -> String {
    itertools::join(raw.split_whitespace(), " ").to_lowercase()
}

/// Formats an amount to exactly two decimal places for fingerprinting.
pub fn canonical_amount(amount: Decimal) -> String {
    let mut a = amount.round_dp(2);
    a.rescale(2);
    a.to_string()
}

/// ISO `YYYY-MM-DD` form used in fingerprints and write-backs.
pub fn canonical_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    #[test_case("12.50", Some("12.50"); "plain")]
    #[test_case("12,50", Some("12.50"); "comma_decimal")]
    #[test_case("$1,234.56", Some("1234.56"); "dollar_grouped")]
    #[test_case("€ 1.234,56", Some("1234.56"); "euro_grouped_comma_decimal")]
    #[test_case("1,234,567.89", Some("1234567.89"); "multiple_groups")]
    #[test_case("1,234", Some("1234"); "comma_group_no_decimal")]
    #[test_case("-42.99", Some("-42.99"); "negative")]
    #[test_case("£7", Some("7"); "pound_integer")]
    #[test_case("", None; "empty")]
    #[test_case("   ", None; "blank")]
    #[test_case("n/a", None; "text")]
    fn parse_amount_cases(raw: &str, want: Option<&str>) {
        let want: Option<Decimal> = want.map(|s| s.parse().unwrap());
        assert_eq!(parse_amount(raw), want);
    }

    #[test_case("85%", Some(0.85); "percent_string")]
    #[test_case("0.85", Some(0.85); "fraction_string")]
    #[test_case("85", Some(0.85); "whole_number_percent")]
    #[test_case("1", Some(1.0); "exactly_one")]
    #[test_case("150%", Some(1.0); "clamped_high")]
    #[test_case("-5", Some(0.0); "clamped_low")]
    #[test_case("", None; "empty")]
    #[test_case("high", None; "text")]
    fn parse_confidence_cases(raw: &str, want: Option<f64>) {
        assert_eq!(parse_confidence(raw), want);
    }

    #[test_case("2025-07-01"; "iso")]
    #[test_case("2025/07/01"; "slashed")]
    #[test_case("07/01/2025"; "us")]
    #[test_case(" 2025-07-01 "; "padded")]
    #[test_case("2025-07-01T09:30:00Z"; "timestamp")]
    fn parse_date_equivalents(raw: &str) {
        assert_eq!(
            parse_date(raw),
            Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
        );
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn parse_timestamp_forms() {
        let want = DateTime::parse_from_rfc3339("2025-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_timestamp("2025-01-02T00:00:00Z"), Some(want));
        assert_eq!(parse_timestamp("2025-01-02 00:00:00"), Some(want));
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn description_normalization() {
        assert_eq!(normalize_description("  Coffee   Shop "), "coffee shop");
        assert_eq!(normalize_description("coffee shop"), "coffee shop");
        assert_eq!(normalize_description(""), "");
    }

    #[test_case("12.5", "12.50"; "pads_scale")]
    #[test_case("12.506", "12.51"; "rounds_excess_precision")]
    #[test_case("-3", "-3.00"; "negative_integer")]
    fn canonical_amount_cases(raw: &str, want: &str) {
        let amount: Decimal = raw.parse().unwrap();
        assert_eq!(canonical_amount(amount), want);
    }
}

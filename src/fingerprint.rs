//! Deterministic fingerprints for transaction records.
//!
//! A fingerprint identifies the underlying financial event behind a record
//! so that independent imports of the same event (file upload, sheet pull,
//! re-import) collapse to one identity. It is derived from the normalized
//! (description, amount, date) triple; see `transaction_fingerprint`.

use std::convert::TryInto;

use byteorder::{BigEndian, ByteOrder};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sha1::{Digest, Sha1};

use crate::normalize;

/// Prefix for fingerprints produced by this module. Bump when the hashed
/// representation changes.
pub const FINGERPRINT_PREFIX: &str = "fp1-";

/// Computes the canonical fingerprint for a transaction-shaped record.
///
/// Inputs are normalized before hashing: the description is lowercased
/// with whitespace collapsed, the amount is fixed to two decimal places
/// and the date to `YYYY-MM-DD`. Semantically equal inputs therefore hash
/// identically regardless of import source or formatting.
pub fn transaction_fingerprint(description: &str, amount: Decimal, date: NaiveDate) -> String {
    FingerprintBuilder::new()
        .with_str(&normalize::normalize_description(description))
        .with_str(&normalize::canonical_amount(amount))
        .with_naive_date(date)
        .build_with_prefix(FINGERPRINT_PREFIX)
}

pub fn is_fingerprint(s: &str) -> bool {
    s.starts_with(FINGERPRINT_PREFIX)
}

/// Builds a fingerprint based on length-prefixed values.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    acc: Accumulator,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }

    pub fn build_with_prefix(self, prefix: &str) -> String {
        self.acc.build_with_prefix(prefix)
    }

    pub fn with_naive_date(self, v: NaiveDate) -> Self {
        self.acc
            .with_usize(3 * 4)
            .with_i32(v.year())
            .with_u32(v.month())
            .with_u32(v.day())
            .as_fingerprint_builder()
    }

    pub fn with_str(self, v: &str) -> Self {
        self.acc
            .with_usize(v.len())
            .with_str(v)
            .as_fingerprint_builder()
    }
}

/// Builds parts of a fingerprint based on raw values.
///
/// This does *not* write length prefixes, unlike `FingerprintBuilder`, but
/// is used *by* `FingerprintBuilder`.
#[derive(Debug, Clone)]
struct Accumulator {
    hasher: Sha1,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            hasher: Sha1::new(),
        }
    }

    fn build_with_prefix(self, prefix: &str) -> String {
        use base64::display::Base64Display;
        use base64::engine::general_purpose::STANDARD_NO_PAD;
        let digest = self.hasher.finalize();
        format!("{}{}", prefix, Base64Display::new(&digest, &STANDARD_NO_PAD))
    }

    fn as_fingerprint_builder(self) -> FingerprintBuilder {
        FingerprintBuilder { acc: self }
    }

    fn with_bytes(mut self, v: &[u8]) -> Self {
        self.hasher.update(v);
        self
    }

    fn with_i32(self, v: i32) -> Self {
        let mut buf: [u8; 4] = Default::default();
        BigEndian::write_i32(&mut buf, v);
        self.with_bytes(&buf)
    }

    fn with_str(self, v: &str) -> Self {
        self.with_bytes(v.as_bytes())
    }

    fn with_u32(self, v: u32) -> Self {
        let mut buf: [u8; 4] = Default::default();
        BigEndian::write_u32(&mut buf, v);
        self.with_bytes(&buf)
    }

    fn with_u64(self, v: u64) -> Self {
        let mut buf: [u8; 8] = Default::default();
        BigEndian::write_u64(&mut buf, v);
        self.with_bytes(&buf)
    }

    fn with_usize(self, v: usize) -> Self {
        self.with_u64(v.try_into().expect("usize does not fit into u64"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_case::test_case;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fp(description: &str, amount: &str, y: i32, m: u32, d: u32) -> String {
        transaction_fingerprint(description, amount.parse().unwrap(), date(y, m, d))
    }

    #[test]
    fn deterministic_across_calls() {
        let a = fp("Coffee Shop", "12.50", 2025, 7, 1);
        let b = fp("Coffee Shop", "12.50", 2025, 7, 1);
        assert_eq!(a, b);
        assert!(is_fingerprint(&a));
    }

    #[test_case("  Coffee Shop ", "coffee shop"; "trim_and_case")]
    #[test_case("COFFEE  SHOP", "coffee shop"; "inner_whitespace")]
    fn equal_after_description_normalization(left: &str, right: &str) {
        assert_eq!(fp(left, "12.50", 2025, 7, 1), fp(right, "12.50", 2025, 7, 1));
    }

    #[test]
    fn equal_after_amount_normalization() {
        assert_eq!(fp("coffee", "12.5", 2025, 7, 1), fp("coffee", "12.50", 2025, 7, 1));
    }

    #[test]
    fn distinct_inputs_differ() {
        assert_ne!(fp("coffee", "12.50", 2025, 7, 1), fp("tea", "12.50", 2025, 7, 1));
        assert_ne!(fp("coffee", "12.50", 2025, 7, 1), fp("coffee", "12.51", 2025, 7, 1));
        assert_ne!(fp("coffee", "12.50", 2025, 7, 1), fp("coffee", "12.50", 2025, 7, 2));
    }

    // Length prefixes keep adjacent fields from bleeding into each other.
    #[test]
    fn field_boundaries_are_unambiguous() {
        let a = FingerprintBuilder::new()
            .with_str("ab")
            .with_str("c")
            .build_with_prefix(FINGERPRINT_PREFIX);
        let b = FingerprintBuilder::new()
            .with_str("a")
            .with_str("bc")
            .build_with_prefix(FINGERPRINT_PREFIX);
        assert_ne!(a, b);
    }
}

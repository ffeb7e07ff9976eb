//! Pairwise scoring of a transaction against a candidate document.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::model::{Document, Transaction};
use crate::similarity::description_similarity;

/// Date distance assigned when the document has no date, pushing it
/// outside every window.
pub const MISSING_DATE_SENTINEL_DAYS: i64 = 999;

/// Minimum composite score for an unattended commit.
pub const AUTO_MATCH_MIN_SCORE: f64 = 80.0;

/// Loose prefilter for human-facing candidate lists.
const CANDIDATE_MAX_AMOUNT_DIFF: &str = "100";
const CANDIDATE_MAX_DATE_DIFF_DAYS: i64 = 60;

/// Tight prefilter for unattended matching.
const AUTO_MAX_AMOUNT_DIFF: &str = "0.01";
const AUTO_MAX_DATE_DIFF_DAYS: i64 = 7;

const MEDIUM_MAX_AMOUNT_DIFF: &str = "1.00";
const MEDIUM_MAX_DATE_DIFF_DAYS: i64 = 30;

/// How confident a human reviewer should be in a proposed candidate.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// The measured distance between one transaction and one document.
#[derive(Clone, Debug, PartialEq)]
pub struct PairScore {
    pub amount_diff: Decimal,
    /// Absolute calendar-day distance, or the missing-date sentinel.
    pub date_diff_days: i64,
    pub similarity: f64,
}

impl PairScore {
    pub fn measure(trn: &Transaction, doc: &Document) -> Self {
        let amount_diff = (trn.amount - doc.total).abs();
        let date_diff_days = match doc.date {
            Some(doc_date) => date_diff_days(trn.date, doc_date),
            None => MISSING_DATE_SENTINEL_DAYS,
        };
        let similarity =
            description_similarity(&trn.description, doc.vendor.as_deref().unwrap_or(""));
        Self {
            amount_diff,
            date_diff_days,
            similarity,
        }
    }

    /// Loose filter: is this pair worth offering to a reviewer at all?
    pub fn is_candidate(&self) -> bool {
        self.amount_diff < dec(CANDIDATE_MAX_AMOUNT_DIFF)
            && self.date_diff_days <= CANDIDATE_MAX_DATE_DIFF_DAYS
    }

    /// Tight filter: may this pair be committed without a human?
    pub fn is_auto_match_eligible(&self) -> bool {
        self.amount_diff < dec(AUTO_MAX_AMOUNT_DIFF)
            && self.date_diff_days <= AUTO_MAX_DATE_DIFF_DAYS
    }

    pub fn tier(&self) -> ConfidenceTier {
        if self.is_auto_match_eligible() {
            ConfidenceTier::High
        } else if self.amount_diff < dec(MEDIUM_MAX_AMOUNT_DIFF)
            && self.date_diff_days <= MEDIUM_MAX_DATE_DIFF_DAYS
        {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    /// Composite used only to rank among auto-match-eligible documents.
    pub fn composite(&self) -> f64 {
        let amount_diff = self.amount_diff.to_f64().unwrap_or(f64::MAX);
        (100.0 - amount_diff) * 0.5
            + (100.0 - self.date_diff_days as f64) * 0.3
            + self.similarity * 0.2
    }
}

/// Absolute distance between two dates in whole calendar days.
pub fn date_diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

fn dec(s: &str) -> Decimal {
    s.parse().expect("threshold literal must parse")
}

//! Fixture helpers shared by the unit tests.

use chrono::NaiveDate;

use crate::model::{Document, Transaction};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A transaction fixture with no id; the store assigns one on insert.
pub fn transaction(
    owner_id: &str,
    (year, month, day): (i32, u32, u32),
    description: &str,
    amount: &str,
) -> Transaction {
    Transaction::new(
        owner_id,
        date(year, month, day),
        description,
        amount.parse().unwrap(),
    )
}

/// A document fixture with no id, vendor or date.
pub fn document(owner_id: &str, filename: &str, total: &str) -> Document {
    Document::new(owner_id, filename, total.parse().unwrap())
}

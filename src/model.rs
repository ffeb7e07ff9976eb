//! Record types passed through the matcher and the sync merge engine.
//!
//! These are the concrete shapes of the rows the surrounding application
//! stores; the algorithms only ever see them fully loaded in memory.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type TransactionId = String;
pub type DocumentId = String;

/// Whether a record has been paired with its counterpart.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    #[default]
    Unreconciled,
    Matched,
}

/// Where a transaction was originally created.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Upload,
    GoogleSheets,
    #[default]
    Manual,
    Api,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
}

/// Which side last touched a transaction that round-trips through a sheet.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifiedSource {
    #[default]
    Portal,
    Sheet,
}

/// A single bank-ledger line belonging to one owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub owner_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Categorization confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub status: ReconciliationStatus,
    #[serde(default)]
    pub matched_document_id: Option<DocumentId>,
    #[serde(default)]
    pub source_type: SourceType,
    /// Identifier of the external source, e.g. a spreadsheet id.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    /// Bumped by one on every merge from the sheet path.
    #[serde(default)]
    pub sync_version: i64,
    #[serde(default)]
    pub last_modified_source: ModifiedSource,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        owner_id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            id: String::new(),
            owner_id: owner_id.into(),
            date,
            description: description.into(),
            amount,
            category: None,
            subcategory: None,
            confidence: None,
            confirmed: false,
            status: ReconciliationStatus::default(),
            matched_document_id: None,
            source_type: SourceType::default(),
            source_id: None,
            fingerprint: None,
            sync_version: 0,
            last_modified_source: ModifiedSource::default(),
            sync_status: SyncStatus::default(),
            last_synced_at: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_document_id.is_some()
    }
}

/// An uploaded receipt or invoice belonging to one owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: String,
    pub filename: String,
    #[serde(default)]
    pub vendor: Option<String>,
    /// Document date as extracted; absent when extraction found none.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub total: Decimal,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub status: ReconciliationStatus,
    #[serde(default)]
    pub matched_transaction_id: Option<TransactionId>,
}

impl Document {
    pub fn new(owner_id: impl Into<String>, filename: impl Into<String>, total: Decimal) -> Self {
        Self {
            id: String::new(),
            owner_id: owner_id.into(),
            filename: filename.into(),
            vendor: None,
            date: None,
            total,
            subtotal: None,
            tax: None,
            fee: None,
            status: ReconciliationStatus::default(),
            matched_transaction_id: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_transaction_id.is_some()
    }
}

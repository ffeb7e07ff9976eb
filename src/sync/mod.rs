//! Pull-sync merge engine: reconciling spreadsheet edits into the
//! transaction store.
//!
//! Each sheet row carries two modification stamps. `sheetModifiedAt` is
//! set by the sheet side whenever a human edits the row;
//! `portalModifiedAt` is stamped by the write-back after a merge. A row
//! is only merged when the sheet stamp is strictly newer, which makes a
//! re-run with no intervening edits a no-op: the engine's core
//! correctness property.

pub mod cmd;
pub mod sheet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::fingerprint::transaction_fingerprint;
use crate::model::{ModifiedSource, SourceType, SyncStatus, Transaction, TransactionId};
use crate::normalize;
use crate::store::Store;
use crate::sync::sheet::{col, RowWriteBack, SheetError, SheetSource};

/// One spreadsheet row parsed into typed fields. Ephemeral: lives only
/// for the duration of one pull-sync invocation.
#[derive(Clone, Debug)]
pub struct RowSnapshot {
    /// 1-based sheet row number.
    pub row: usize,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub confidence: Option<f64>,
    pub confirmed: bool,
    pub transaction_id: Option<TransactionId>,
    pub portal_modified_at: Option<DateTime<Utc>>,
    pub sheet_modified_at: Option<DateTime<Utc>>,
}

impl RowSnapshot {
    pub fn parse(row: usize, cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("").trim();
        let opt = |idx: usize| {
            let v = cell(idx);
            (!v.is_empty()).then(|| v.to_string())
        };
        Self {
            row,
            date: normalize::parse_date(cell(col::DATE)),
            description: cell(col::DESCRIPTION).to_string(),
            amount: normalize::parse_amount(cell(col::AMOUNT)),
            category: opt(col::CATEGORY),
            subcategory: opt(col::SUBCATEGORY),
            confidence: normalize::parse_confidence(cell(col::CONFIDENCE)),
            confirmed: parse_confirmed(cell(col::STATUS)),
            transaction_id: opt(col::TRANSACTION_ID),
            portal_modified_at: normalize::parse_timestamp(cell(col::PORTAL_MODIFIED_AT)),
            sheet_modified_at: normalize::parse_timestamp(cell(col::SHEET_MODIFIED_AT)),
        }
    }

    /// Steps 1–2 of the row classification: is there a human edit newer
    /// than the portal's copy?
    fn fresh_edit(&self) -> Option<DateTime<Utc>> {
        let sheet_ts = self.sheet_modified_at?;
        match self.portal_modified_at {
            Some(portal_ts) if sheet_ts <= portal_ts => None,
            _ => Some(sheet_ts),
        }
    }
}

fn parse_confirmed(cell: &str) -> bool {
    matches!(
        cell.to_lowercase().as_str(),
        "confirmed" | "true" | "yes" | "y" | "1"
    )
}

/// Counters returned to the caller for display.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    /// Rows bearing a fresh-or-stale sheet edit stamp; untouched rows are
    /// not counted.
    pub rows_processed: usize,
    pub rows_updated: usize,
    pub rows_inserted: usize,
    pub rows_skipped: usize,
    pub message: String,
}

/// Runs one pull sync for a sheet belonging to `owner_id`.
///
/// Per-row failures are logged, counted as skips and noted in the
/// summary message; only a failed read of the sheet grid aborts the
/// invocation.
pub fn pull_sync(
    store: &mut dyn Store,
    sheet: &mut dyn SheetSource,
    owner_id: &str,
    source_id: &str,
    now: DateTime<Utc>,
) -> Result<PullSummary, SheetError> {
    let rows = sheet.read_rows()?;

    let mut summary = PullSummary::default();
    let mut row_errors = 0usize;
    let mut write_backs = Vec::<RowWriteBack>::new();

    for (row_num, cells) in &rows {
        let snap = RowSnapshot::parse(*row_num, cells);
        if snap.sheet_modified_at.is_none() {
            // No human edit since the last sync; nothing to merge.
            continue;
        }
        summary.rows_processed += 1;

        if snap.fresh_edit().is_none() {
            // Stale or round-trip echo; the portal copy is fresher.
            summary.rows_skipped += 1;
            continue;
        }

        // An incomplete edit the user must fix; never guess values.
        let (Some(date), Some(amount)) = (snap.date, snap.amount) else {
            warn!(row = snap.row, "row missing parseable date or amount, skipping");
            summary.rows_skipped += 1;
            continue;
        };
        if snap.description.is_empty() {
            warn!(row = snap.row, "row missing description, skipping");
            summary.rows_skipped += 1;
            continue;
        }

        let fingerprint = transaction_fingerprint(&snap.description, amount, date);

        let outcome = match &snap.transaction_id {
            Some(id) => merge_update(store, owner_id, id, &snap, &fingerprint, now),
            None => merge_insert(store, owner_id, source_id, &snap, date, amount, &fingerprint, now),
        };
        match outcome {
            Ok(RowOutcome::Updated(id)) => {
                summary.rows_updated += 1;
                write_backs.push(write_back(&snap, &fingerprint, id, now));
            }
            Ok(RowOutcome::Inserted(id)) => {
                summary.rows_inserted += 1;
                write_backs.push(write_back(&snap, &fingerprint, id, now));
            }
            Ok(RowOutcome::Duplicate(id)) => {
                // Same underlying event already stored; relink the row
                // instead of inserting a second copy.
                summary.rows_skipped += 1;
                write_backs.push(write_back(&snap, &fingerprint, id, now));
            }
            Ok(RowOutcome::Dangling) => {
                summary.rows_skipped += 1;
            }
            Err(err) => {
                warn!(row = snap.row, error = %err, "row merge failed, continuing");
                summary.rows_skipped += 1;
                row_errors += 1;
            }
        }
    }

    summary.message = format!(
        "{} inserted, {} updated, {} skipped",
        summary.rows_inserted, summary.rows_updated, summary.rows_skipped
    );
    if row_errors > 0 {
        summary.message.push_str(&format!(", {} rows failed", row_errors));
    }

    if !write_backs.is_empty() {
        if let Err(err) = sheet.apply_write_backs(&write_backs) {
            // The merge itself committed; the next pull will reprocess
            // these rows as apparent edits and dedupe by fingerprint.
            warn!(error = %err, "sheet write-back failed");
            summary.message.push_str("; sheet write-back failed");
        }
    }

    Ok(summary)
}

enum RowOutcome {
    Updated(TransactionId),
    Inserted(TransactionId),
    Duplicate(TransactionId),
    Dangling,
}

fn merge_update(
    store: &mut dyn Store,
    owner_id: &str,
    id: &str,
    snap: &RowSnapshot,
    fingerprint: &str,
    now: DateTime<Utc>,
) -> Result<RowOutcome, crate::store::StoreError> {
    let Some(mut trn) = store.transaction(owner_id, id)? else {
        // The referenced transaction is gone (e.g. deleted in the
        // portal); re-inserting would resurrect it, so leave the row
        // for the user.
        warn!(row = snap.row, transaction_id = id, "sheet row references unknown transaction");
        return Ok(RowOutcome::Dangling);
    };
    trn.category = snap.category.clone();
    trn.subcategory = snap.subcategory.clone();
    trn.confidence = snap.confidence;
    trn.confirmed = snap.confirmed;
    trn.fingerprint = Some(fingerprint.to_string());
    trn.sync_version += 1;
    trn.last_modified_source = ModifiedSource::Sheet;
    trn.sync_status = SyncStatus::Synced;
    trn.last_synced_at = Some(now);
    let id = trn.id.clone();
    store.update_transaction(trn)?;
    Ok(RowOutcome::Updated(id))
}

#[allow(clippy::too_many_arguments)]
fn merge_insert(
    store: &mut dyn Store,
    owner_id: &str,
    source_id: &str,
    snap: &RowSnapshot,
    date: NaiveDate,
    amount: Decimal,
    fingerprint: &str,
    now: DateTime<Utc>,
) -> Result<RowOutcome, crate::store::StoreError> {
    if let Some(existing) = store.find_transaction_by_fingerprint(owner_id, fingerprint)? {
        return Ok(RowOutcome::Duplicate(existing.id));
    }

    let mut trn = Transaction::new(owner_id, date, &snap.description, amount);
    trn.category = snap.category.clone();
    trn.subcategory = snap.subcategory.clone();
    trn.confidence = snap.confidence;
    trn.confirmed = snap.confirmed;
    trn.source_type = SourceType::GoogleSheets;
    trn.source_id = Some(source_id.to_string());
    trn.fingerprint = Some(fingerprint.to_string());
    trn.sync_version = 1;
    trn.last_modified_source = ModifiedSource::Sheet;
    trn.sync_status = SyncStatus::Synced;
    trn.last_synced_at = Some(now);
    let id = store.insert_transaction(trn)?;
    Ok(RowOutcome::Inserted(id))
}

fn write_back(
    snap: &RowSnapshot,
    fingerprint: &str,
    transaction_id: TransactionId,
    now: DateTime<Utc>,
) -> RowWriteBack {
    RowWriteBack {
        row: snap.row,
        fingerprint: fingerprint.to_string(),
        transaction_id,
        portal_modified_at: now,
    }
}

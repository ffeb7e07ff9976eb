//! The fixed 13-column spreadsheet layout and access to a sheet tab.
//!
//! The external spreadsheet holds one transaction per row. Columns past
//! the visible ledger fields carry the sync bookkeeping: the fingerprint,
//! the linked transaction id, and the portal/sheet modification stamps
//! that drive the pull-sync classification.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::TransactionId;
use crate::normalize;

/// Column positions within a sheet row.
pub mod col {
    pub const DATE: usize = 0;
    pub const DESCRIPTION: usize = 1;
    pub const AMOUNT: usize = 2;
    pub const CATEGORY: usize = 3;
    pub const SUBCATEGORY: usize = 4;
    pub const CONFIDENCE: usize = 5;
    pub const STATUS: usize = 6;
    pub const SOURCE: usize = 7;
    pub const FINGERPRINT: usize = 8;
    pub const TRANSACTION_ID: usize = 9;
    pub const PORTAL_MODIFIED_AT: usize = 10;
    pub const SHEET_MODIFIED_AT: usize = 11;
    pub const SHEET_MODIFIED_BY: usize = 12;
}

pub const COLUMN_COUNT: usize = 13;

pub const HEADER: [&str; COLUMN_COUNT] = [
    "Date",
    "Description",
    "Amount",
    "Category",
    "Subcategory",
    "Confidence",
    "Status",
    "Source",
    "Fingerprint",
    "Transaction ID",
    "Portal Modified At",
    "Sheet Modified At",
    "Sheet Modified By",
];

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("reading sheet: {0}")]
    Read(String),
    #[error("writing sheet: {0}")]
    Write(String),
}

/// The write-back applied to one row after its edit has been merged:
/// stamp identity and freshness, clear the edit markers so the next pull
/// does not reprocess the same edit.
#[derive(Clone, Debug, PartialEq)]
pub struct RowWriteBack {
    /// 1-based sheet row number (the header is row 1).
    pub row: usize,
    pub fingerprint: String,
    pub transaction_id: TransactionId,
    pub portal_modified_at: DateTime<Utc>,
}

/// A spreadsheet tab, read as a whole grid and written back in batch.
pub trait SheetSource {
    /// All data rows in order, each keyed by its 1-based sheet row number
    /// and padded to `COLUMN_COUNT` cells.
    fn read_rows(&self) -> Result<Vec<(usize, Vec<String>)>, SheetError>;

    fn apply_write_backs(&mut self, writes: &[RowWriteBack]) -> Result<(), SheetError>;
}

/// Applies one write-back to a row's cells. Shared by implementations.
pub fn apply_to_cells(cells: &mut [String], write: &RowWriteBack) {
    cells[col::FINGERPRINT] = write.fingerprint.clone();
    cells[col::TRANSACTION_ID] = write.transaction_id.clone();
    cells[col::PORTAL_MODIFIED_AT] = write.portal_modified_at.to_rfc3339();
    cells[col::SHEET_MODIFIED_AT].clear();
    cells[col::SHEET_MODIFIED_BY].clear();
}

pub fn pad_row(mut cells: Vec<String>) -> Vec<String> {
    cells.resize(COLUMN_COUNT, String::new());
    cells
}

/// A sheet tab stored as a CSV file with the standard header row, the
/// file-backed stand-in for the spreadsheet API.
#[derive(Debug)]
pub struct CsvSheet {
    path: PathBuf,
}

impl CsvSheet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<Vec<String>>, SheetError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| SheetError::Read(e.to_string()))?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| SheetError::Read(e.to_string()))?;
            rows.push(pad_row(record.iter().map(str::to_string).collect()));
        }
        Ok(rows)
    }
}

impl SheetSource for CsvSheet {
    fn read_rows(&self) -> Result<Vec<(usize, Vec<String>)>, SheetError> {
        Ok(self
            .read_all()?
            .into_iter()
            .enumerate()
            // Row 1 is the header; data starts at row 2.
            .map(|(i, cells)| (i + 2, cells))
            .collect())
    }

    fn apply_write_backs(&mut self, writes: &[RowWriteBack]) -> Result<(), SheetError> {
        let mut rows = self.read_all()?;
        for write in writes {
            let Some(cells) = write.row.checked_sub(2).and_then(|i| rows.get_mut(i)) else {
                return Err(SheetError::Write(format!(
                    "row {} out of range for {:?}",
                    write.row, self.path
                )));
            };
            apply_to_cells(cells, write);
        }

        let mut writer =
            csv::Writer::from_path(&self.path).map_err(|e| SheetError::Write(e.to_string()))?;
        writer
            .write_record(HEADER)
            .map_err(|e| SheetError::Write(e.to_string()))?;
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| SheetError::Write(e.to_string()))?;
        }
        writer.flush().map_err(|e| SheetError::Write(e.to_string()))
    }
}

/// Formats a timestamp cell the way write-backs do.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Reads an optional timestamp cell.
pub fn parse_timestamp_cell(cell: &str) -> Option<DateTime<Utc>> {
    normalize::parse_timestamp(cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write as _;

    fn write_fixture(rows: &[[&str; COLUMN_COUNT]]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{}", HEADER.join(",")).unwrap();
        for row in rows {
            writeln!(f, "{}", row.join(",")).unwrap();
        }
        (dir, path)
    }

    #[test]
    fn reads_rows_with_sheet_numbering() {
        let (_dir, path) = write_fixture(&[[
            "2025-07-01",
            "Coffee",
            "12.50",
            "Meals",
            "",
            "0.9",
            "",
            "google_sheets",
            "",
            "",
            "",
            "2025-07-02T10:00:00Z",
            "alice",
        ]]);
        let sheet = CsvSheet::new(&path);
        let rows = sheet.read_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[0].1[col::DESCRIPTION], "Coffee");
        assert_eq!(rows[0].1.len(), COLUMN_COUNT);
    }

    #[test]
    fn short_rows_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{}", HEADER.join(",")).unwrap();
        writeln!(f, "2025-07-01,Coffee,12.50").unwrap();
        drop(f);

        let sheet = CsvSheet::new(&path);
        let rows = sheet.read_rows().unwrap();
        assert_eq!(rows[0].1.len(), COLUMN_COUNT);
        assert_eq!(rows[0].1[col::SHEET_MODIFIED_BY], "");
    }

    #[test]
    fn write_back_stamps_and_clears() {
        let (_dir, path) = write_fixture(&[[
            "2025-07-01",
            "Coffee",
            "12.50",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "2025-07-02T10:00:00Z",
            "alice",
        ]]);
        let mut sheet = CsvSheet::new(&path);
        let ts = "2025-07-03T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        sheet
            .apply_write_backs(&[RowWriteBack {
                row: 2,
                fingerprint: "fp1-test".to_string(),
                transaction_id: "trn-1".to_string(),
                portal_modified_at: ts,
            }])
            .unwrap();

        let rows = sheet.read_rows().unwrap();
        let cells = &rows[0].1;
        assert_eq!(cells[col::FINGERPRINT], "fp1-test");
        assert_eq!(cells[col::TRANSACTION_ID], "trn-1");
        assert_eq!(parse_timestamp_cell(&cells[col::PORTAL_MODIFIED_AT]), Some(ts));
        assert_eq!(cells[col::SHEET_MODIFIED_AT], "");
        assert_eq!(cells[col::SHEET_MODIFIED_BY], "");
    }

    #[test]
    fn write_back_out_of_range_row_fails() {
        let (_dir, path) = write_fixture(&[]);
        let mut sheet = CsvSheet::new(&path);
        let err = sheet
            .apply_write_backs(&[RowWriteBack {
                row: 5,
                fingerprint: String::new(),
                transaction_id: String::new(),
                portal_modified_at: Utc::now(),
            }])
            .unwrap_err();
        assert!(matches!(err, SheetError::Write(_)));
    }
}

//! Storage seam between the algorithms and whatever actually holds the
//! rows.
//!
//! The matcher and the sync engine only ever talk to the `Store` trait.
//! `MemoryStore` is the bundled implementation: an in-memory table pair
//! with a JSON file form, standing in for the managed database so the
//! algorithms can run from the command line and from tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filespec::{self, FileSpec};
use crate::model::{Document, DocumentId, ReconciliationStatus, Transaction, TransactionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),
    #[error("transaction already matched: {0}")]
    TransactionAlreadyMatched(TransactionId),
    #[error("document already matched: {0}")]
    DocumentAlreadyMatched(DocumentId),
    #[error("storage failure: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row-oriented access to transactions and documents, owner-scoped.
pub trait Store {
    /// Unreconciled transactions for the owner, newest date first.
    fn unreconciled_transactions(&self, owner_id: &str) -> StoreResult<Vec<Transaction>>;

    /// Unreconciled documents for the owner, newest date first.
    fn unreconciled_documents(&self, owner_id: &str) -> StoreResult<Vec<Document>>;

    fn transaction(&self, owner_id: &str, id: &str) -> StoreResult<Option<Transaction>>;

    fn document(&self, owner_id: &str, id: &str) -> StoreResult<Option<Document>>;

    fn find_transaction_by_fingerprint(
        &self,
        owner_id: &str,
        fingerprint: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// Links both sides of a pairing atomically. Fails if either record is
    /// already linked; this is the commit-time guard against two passes
    /// racing to claim the same document.
    fn set_match(&mut self, transaction_id: &str, document_id: &str) -> StoreResult<()>;

    /// Clears the transaction's link and the document's reciprocal link,
    /// resetting both statuses.
    fn clear_match(&mut self, transaction_id: &str) -> StoreResult<()>;

    /// Inserts a transaction, assigning an id if the record carries none.
    fn insert_transaction(&mut self, trn: Transaction) -> StoreResult<TransactionId>;

    fn update_transaction(&mut self, trn: Transaction) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: BTreeMap<TransactionId, Transaction>,
    documents: BTreeMap<DocumentId, Document>,
}

/// On-disk form of a `MemoryStore`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(file: &FileSpec) -> anyhow::Result<Self> {
        let content = filespec::read_file(file)?;
        let parsed: StoreFile = serde_json::from_str(&content)?;
        let mut store = Self::new();
        for trn in parsed.transactions {
            store.transactions.insert(trn.id.clone(), trn);
        }
        for doc in parsed.documents {
            store.documents.insert(doc.id.clone(), doc);
        }
        Ok(store)
    }

    pub fn save(&self, file: &FileSpec) -> anyhow::Result<()> {
        let out = StoreFile {
            transactions: self.transactions.values().cloned().collect(),
            documents: self.documents.values().cloned().collect(),
        };
        filespec::write_file(file, &serde_json::to_string_pretty(&out)?)
    }

    /// Documents are created by the upload pipeline, which is outside this
    /// core; tests and fixtures add them directly.
    pub fn insert_document(&mut self, mut doc: Document) -> DocumentId {
        if doc.id.is_empty() {
            doc.id = format!("doc-{}", uuid_b64::UuidB64::new().to_istring());
        }
        let id = doc.id.clone();
        self.documents.insert(id.clone(), doc);
        id
    }
}

impl Store for MemoryStore {
    fn unreconciled_transactions(&self, owner_id: &str) -> StoreResult<Vec<Transaction>> {
        let mut trns: Vec<Transaction> = self
            .transactions
            .values()
            .filter(|t| t.owner_id == owner_id && t.status == ReconciliationStatus::Unreconciled)
            .cloned()
            .collect();
        trns.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(trns)
    }

    fn unreconciled_documents(&self, owner_id: &str) -> StoreResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .documents
            .values()
            .filter(|d| d.owner_id == owner_id && d.status == ReconciliationStatus::Unreconciled)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(docs)
    }

    fn transaction(&self, owner_id: &str, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self
            .transactions
            .get(id)
            .filter(|t| t.owner_id == owner_id)
            .cloned())
    }

    fn document(&self, owner_id: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .documents
            .get(id)
            .filter(|d| d.owner_id == owner_id)
            .cloned())
    }

    fn find_transaction_by_fingerprint(
        &self,
        owner_id: &str,
        fingerprint: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self
            .transactions
            .values()
            .find(|t| t.owner_id == owner_id && t.fingerprint.as_deref() == Some(fingerprint))
            .cloned())
    }

    fn set_match(&mut self, transaction_id: &str, document_id: &str) -> StoreResult<()> {
        let trn = self
            .transactions
            .get(transaction_id)
            .ok_or_else(|| StoreError::TransactionNotFound(transaction_id.to_string()))?;
        let doc = self
            .documents
            .get(document_id)
            .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))?;
        if trn.matched_document_id.is_some() {
            return Err(StoreError::TransactionAlreadyMatched(
                transaction_id.to_string(),
            ));
        }
        if doc.matched_transaction_id.is_some() {
            return Err(StoreError::DocumentAlreadyMatched(document_id.to_string()));
        }

        let trn = self.transactions.get_mut(transaction_id).expect("present");
        trn.matched_document_id = Some(document_id.to_string());
        trn.status = ReconciliationStatus::Matched;
        let doc = self.documents.get_mut(document_id).expect("present");
        doc.matched_transaction_id = Some(transaction_id.to_string());
        doc.status = ReconciliationStatus::Matched;
        Ok(())
    }

    fn clear_match(&mut self, transaction_id: &str) -> StoreResult<()> {
        let trn = self
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| StoreError::TransactionNotFound(transaction_id.to_string()))?;
        let doc_id = trn.matched_document_id.take();
        trn.status = ReconciliationStatus::Unreconciled;
        if let Some(doc_id) = doc_id {
            if let Some(doc) = self.documents.get_mut(&doc_id) {
                doc.matched_transaction_id = None;
                doc.status = ReconciliationStatus::Unreconciled;
            }
        }
        Ok(())
    }

    fn insert_transaction(&mut self, mut trn: Transaction) -> StoreResult<TransactionId> {
        if trn.id.is_empty() {
            trn.id = format!("trn-{}", uuid_b64::UuidB64::new().to_istring());
        }
        let id = trn.id.clone();
        self.transactions.insert(id.clone(), trn);
        Ok(id)
    }

    fn update_transaction(&mut self, trn: Transaction) -> StoreResult<()> {
        if !self.transactions.contains_key(&trn.id) {
            return Err(StoreError::TransactionNotFound(trn.id));
        }
        self.transactions.insert(trn.id.clone(), trn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testutil::{document, transaction};

    fn store_with_pair() -> (MemoryStore, TransactionId, DocumentId) {
        let mut store = MemoryStore::new();
        let trn_id = store
            .insert_transaction(transaction("u1", (2025, 7, 1), "coffee", "12.50"))
            .unwrap();
        let doc_id = store.insert_document(document("u1", "receipt.pdf", "12.50"));
        (store, trn_id, doc_id)
    }

    #[test]
    fn insert_assigns_ids() {
        let (store, trn_id, doc_id) = store_with_pair();
        assert!(trn_id.starts_with("trn-"));
        assert!(doc_id.starts_with("doc-"));
        assert!(store.transaction("u1", &trn_id).unwrap().is_some());
        // Owner scoping: the same id under another owner is invisible.
        assert!(store.transaction("u2", &trn_id).unwrap().is_none());
    }

    #[test]
    fn set_match_links_both_sides() {
        let (mut store, trn_id, doc_id) = store_with_pair();
        store.set_match(&trn_id, &doc_id).unwrap();

        let trn = store.transaction("u1", &trn_id).unwrap().unwrap();
        assert_eq!(trn.status, ReconciliationStatus::Matched);
        assert_eq!(trn.matched_document_id.as_deref(), Some(doc_id.as_str()));
        let doc = store.document("u1", &doc_id).unwrap().unwrap();
        assert_eq!(doc.status, ReconciliationStatus::Matched);
        assert_eq!(doc.matched_transaction_id.as_deref(), Some(trn_id.as_str()));

        // Matched records drop out of the unreconciled listings.
        assert!(store.unreconciled_transactions("u1").unwrap().is_empty());
        assert!(store.unreconciled_documents("u1").unwrap().is_empty());
    }

    #[test]
    fn set_match_rejects_already_linked() {
        let (mut store, trn_id, doc_id) = store_with_pair();
        let other_trn = store
            .insert_transaction(transaction("u1", (2025, 7, 2), "coffee again", "12.50"))
            .unwrap();
        store.set_match(&trn_id, &doc_id).unwrap();

        assert!(matches!(
            store.set_match(&other_trn, &doc_id),
            Err(StoreError::DocumentAlreadyMatched(_))
        ));
        assert!(matches!(
            store.set_match(&trn_id, &doc_id),
            Err(StoreError::TransactionAlreadyMatched(_))
        ));
    }

    #[test]
    fn clear_match_resets_both_sides() {
        let (mut store, trn_id, doc_id) = store_with_pair();
        store.set_match(&trn_id, &doc_id).unwrap();
        store.clear_match(&trn_id).unwrap();

        let trn = store.transaction("u1", &trn_id).unwrap().unwrap();
        assert_eq!(trn.status, ReconciliationStatus::Unreconciled);
        assert_eq!(trn.matched_document_id, None);
        let doc = store.document("u1", &doc_id).unwrap().unwrap();
        assert_eq!(doc.status, ReconciliationStatus::Unreconciled);
        assert_eq!(doc.matched_transaction_id, None);
    }

    #[test]
    fn listings_order_newest_first() {
        let mut store = MemoryStore::new();
        store
            .insert_transaction(transaction("u1", (2025, 7, 1), "older", "1.00"))
            .unwrap();
        store
            .insert_transaction(transaction("u1", (2025, 7, 5), "newer", "2.00"))
            .unwrap();
        let listed = store.unreconciled_transactions("u1").unwrap();
        assert_eq!(listed[0].description, "newer");
        assert_eq!(listed[1].description, "older");
    }

    #[test]
    fn fingerprint_lookup() {
        let mut store = MemoryStore::new();
        let mut trn = transaction("u1", (2025, 7, 1), "coffee", "12.50");
        trn.fingerprint = Some("fp1-abc".to_string());
        store.insert_transaction(trn).unwrap();

        assert!(store
            .find_transaction_by_fingerprint("u1", "fp1-abc")
            .unwrap()
            .is_some());
        assert!(store
            .find_transaction_by_fingerprint("u2", "fp1-abc")
            .unwrap()
            .is_none());
        assert!(store
            .find_transaction_by_fingerprint("u1", "fp1-other")
            .unwrap()
            .is_none());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let file = FileSpec::Path(path);

        let (store, trn_id, doc_id) = store_with_pair();
        store.save(&file).unwrap();

        let reloaded = MemoryStore::load(&file).unwrap();
        assert!(reloaded.transaction("u1", &trn_id).unwrap().is_some());
        assert!(reloaded.document("u1", &doc_id).unwrap().is_some());
    }
}

//! Reconciliation matching: pairing transactions with the documents that
//! explain them.
//!
//! One auto-match pass loads every unreconciled transaction and document
//! for an owner, scores the cross product under the tight prefilter, and
//! commits the best pairing per transaction when its composite score
//! clears the threshold. The pass threads a claimed set through the loop
//! so a document committed for one transaction is never offered to the
//! next within the same invocation, even though the store is updated
//! pair by pair.

pub mod cmd;

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::model::{Document, DocumentId, Transaction, TransactionId};
use crate::score::{ConfidenceTier, PairScore, AUTO_MATCH_MIN_SCORE};
use crate::store::{Store, StoreError, StoreResult};

/// Cap on candidates offered to a reviewer per transaction.
pub const MAX_CANDIDATES_PER_TRANSACTION: usize = 5;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MatchPair {
    pub transaction_id: TransactionId,
    pub document_id: DocumentId,
}

/// Result of one auto-match pass, for caller-side auditing and display.
#[derive(Clone, Debug, Serialize)]
pub struct AutoMatchSummary {
    pub matched_count: usize,
    pub matches: Vec<MatchPair>,
}

/// Runs one committing auto-match pass for the owner.
///
/// A failed commit of a single pairing is logged and skipped; the pass
/// carries on with the remaining transactions. Only the initial bulk
/// reads abort the invocation.
pub fn auto_match(store: &mut dyn Store, owner_id: &str) -> StoreResult<AutoMatchSummary> {
    let transactions = store.unreconciled_transactions(owner_id)?;
    let documents = store.unreconciled_documents(owner_id)?;

    let mut claimed = HashSet::<DocumentId>::new();
    let mut matches = Vec::new();
    for trn in &transactions {
        if trn.is_matched() {
            continue;
        }
        let Some(document_id) = best_auto_match(trn, &documents, &claimed) else {
            continue;
        };
        match store.set_match(&trn.id, &document_id) {
            Ok(()) => {
                claimed.insert(document_id.clone());
                matches.push(MatchPair {
                    transaction_id: trn.id.clone(),
                    document_id,
                });
            }
            Err(err) => {
                // Partial progress is expected; the next pass will see the
                // corrected unmatched lists.
                warn!(
                    transaction_id = %trn.id,
                    document_id = %document_id,
                    error = %err,
                    "failed to commit pairing, continuing"
                );
            }
        }
    }

    Ok(AutoMatchSummary {
        matched_count: matches.len(),
        matches,
    })
}

/// Picks the best auto-match-eligible document for one transaction, or
/// `None` if no eligible document clears the score threshold.
///
/// Ties resolve to the first document encountered: a later document only
/// displaces the incumbent on a strictly higher composite score. This is
/// a stable but otherwise arbitrary tie-break.
fn best_auto_match(
    trn: &Transaction,
    documents: &[Document],
    claimed: &HashSet<DocumentId>,
) -> Option<DocumentId> {
    let mut best: Option<(&Document, f64)> = None;
    for doc in documents {
        if doc.is_matched() || claimed.contains(&doc.id) {
            continue;
        }
        let score = PairScore::measure(trn, doc);
        if !score.is_auto_match_eligible() {
            continue;
        }
        let composite = score.composite();
        match best {
            Some((_, best_composite)) if composite <= best_composite => {}
            _ => best = Some((doc, composite)),
        }
    }
    match best {
        Some((doc, composite)) if composite >= AUTO_MATCH_MIN_SCORE => Some(doc.id.clone()),
        _ => None,
    }
}

/// One document proposed to a human reviewer.
#[derive(Clone, Debug, Serialize)]
pub struct Candidate {
    pub document_id: DocumentId,
    pub filename: String,
    pub vendor: Option<String>,
    pub tier: ConfidenceTier,
    pub amount_diff: Decimal,
    pub date_diff_days: i64,
    pub similarity: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct TransactionCandidates {
    pub transaction_id: TransactionId,
    pub candidates: Vec<Candidate>,
}

/// Non-committing candidate listing for "show me potential matches"
/// flows: loose prefilter only, sorted by tier then amount distance,
/// truncated per transaction.
pub fn list_candidates(
    transactions: &[Transaction],
    documents: &[Document],
) -> Vec<TransactionCandidates> {
    transactions
        .iter()
        .filter(|trn| !trn.is_matched())
        .map(|trn| {
            let mut candidates: Vec<Candidate> = documents
                .iter()
                .filter(|doc| !doc.is_matched())
                .filter_map(|doc| {
                    let score = PairScore::measure(trn, doc);
                    score.is_candidate().then(|| Candidate {
                        document_id: doc.id.clone(),
                        filename: doc.filename.clone(),
                        vendor: doc.vendor.clone(),
                        tier: score.tier(),
                        amount_diff: score.amount_diff,
                        date_diff_days: score.date_diff_days,
                        similarity: score.similarity,
                    })
                })
                .collect();
            candidates.sort_by(|a, b| a.tier.cmp(&b.tier).then(a.amount_diff.cmp(&b.amount_diff)));
            candidates.truncate(MAX_CANDIDATES_PER_TRANSACTION);
            TransactionCandidates {
                transaction_id: trn.id.clone(),
                candidates,
            }
        })
        .collect()
}

/// Candidate listing straight off the store's unreconciled sets.
pub fn candidates_for_owner(
    store: &dyn Store,
    owner_id: &str,
) -> StoreResult<Vec<TransactionCandidates>> {
    let transactions = store.unreconciled_transactions(owner_id)?;
    let documents = store.unreconciled_documents(owner_id)?;
    Ok(list_candidates(&transactions, &documents))
}

/// Manually links one transaction to one document. Both records must
/// belong to the owner; the ownership check precedes any mutation.
pub fn match_pair(
    store: &mut dyn Store,
    owner_id: &str,
    transaction_id: &str,
    document_id: &str,
) -> StoreResult<()> {
    let trn = store
        .transaction(owner_id, transaction_id)?
        .ok_or_else(|| StoreError::TransactionNotFound(transaction_id.to_string()))?;
    let doc = store
        .document(owner_id, document_id)?
        .ok_or_else(|| StoreError::DocumentNotFound(document_id.to_string()))?;
    store.set_match(&trn.id, &doc.id)
}

/// Manually clears a transaction's pairing (and the document's reciprocal
/// link, if any). Ownership check precedes mutation.
pub fn unmatch(store: &mut dyn Store, owner_id: &str, transaction_id: &str) -> StoreResult<()> {
    let trn = store
        .transaction(owner_id, transaction_id)?
        .ok_or_else(|| StoreError::TransactionNotFound(transaction_id.to_string()))?;
    store.clear_match(&trn.id)
}

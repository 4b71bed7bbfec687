use tracing::error;

use toolhunt_core::types::{RankedResult, ToolRecord};
use toolhunt_core::{DocumentStore, Error, Result};

/// Map ranked identifiers back to catalog records, keeping the ranking order.
///
/// An identifier with no record means the store and the indexes disagree. That
/// aborts debug builds and fails the request otherwise; nothing is dropped.
pub fn resolve(ranked: &[RankedResult], store: &DocumentStore) -> Result<Vec<ToolRecord>> {
    ranked
        .iter()
        .map(|r| {
            let record = store.record(r.doc_id);
            debug_assert!(record.is_some(), "ranked id {} missing from document store of {}", r.doc_id, store.len());
            record.cloned().ok_or_else(|| {
                error!(doc_id = r.doc_id, store_len = store.len(), "ranked id has no catalog record");
                Error::InternalConsistency(format!("document {} is not in the store", r.doc_id))
            })
        })
        .collect()
}

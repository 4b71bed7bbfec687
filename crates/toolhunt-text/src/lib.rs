//! toolhunt-text
//!
//! Lexical retrieval: a BM25 index (Tantivy, in RAM) over the document store.

pub mod tantivy_utils;
pub mod index;

pub use index::TantivyIndexer;

use toolhunt_core::traits::TextIndexer;
use toolhunt_core::types::ScoredCandidate;
use toolhunt_core::{Error, Result};

/// Default cap on lexical candidates.
pub const DEFAULT_LEXICAL_LIMIT: usize = 10;

/// Candidates descending by BM25 score, at most `limit`.
///
/// Backend errors that already carry an [`Error`] (an unusable index) keep
/// their kind; anything else becomes [`Error::Operation`].
pub fn retrieve_lexical<TI: TextIndexer + ?Sized>(index: &TI, query: &str, limit: usize) -> Result<Vec<ScoredCandidate>> {
    let hits = index.search(query, limit).map_err(|e| match e.downcast::<Error>() {
        Ok(err) => err,
        Err(other) => Error::Operation(format!("lexical search failed: {:#}", other)),
    })?;
    tracing::debug!(hits = hits.len(), limit, "lexical retrieval");
    Ok(hits)
}

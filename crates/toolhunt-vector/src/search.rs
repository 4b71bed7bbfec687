use tracing::debug;

use toolhunt_core::traits::Embedder;
use toolhunt_core::types::ScoredCandidate;
use toolhunt_core::{Error, Result};

use crate::embed::embed_query;
use crate::table::EmbeddingTable;

/// Semantic candidates for an already embedded query.
///
/// The table's top `k` are taken first and the inclusive `threshold` is
/// applied afterwards, so a small `k` can hide matches that would pass the
/// threshold.
pub fn retrieve_semantic_with_vector(table: &EmbeddingTable, query_vec: &[f32], k: usize, threshold: f32) -> Result<Vec<ScoredCandidate>> {
	if table.is_empty() || k == 0 { return Ok(Vec::new()); }
	if query_vec.len() != table.dim() {
		return Err(Error::Embedding(format!("query has {} dims, table has {}", query_vec.len(), table.dim())));
	}
	let top = table.top_k(query_vec, k);
	let considered = top.len();
	let hits: Vec<ScoredCandidate> = top
		.into_iter()
		.filter(|&(_, similarity)| similarity >= threshold)
		.map(|(id, similarity)| ScoredCandidate::semantic(id, similarity))
		.collect();
	debug!(considered, kept = hits.len(), threshold, "semantic retrieval");
	Ok(hits)
}

/// Embed `query` once and retrieve semantic candidates for it.
pub fn retrieve_semantic(table: &EmbeddingTable, embedder: &dyn Embedder, query: &str, k: usize, threshold: f32) -> Result<Vec<ScoredCandidate>> {
	let query_vec = embed_query(embedder, query)?;
	retrieve_semantic_with_vector(table, &query_vec, k, threshold)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table() -> EmbeddingTable {
		EmbeddingTable::from_vectors(vec![
			vec![3.0, 4.0],  // cos with [1,0] = 0.6
			vec![1.0, 0.0],  // 1.0
			vec![0.0, 1.0],  // 0.0
			vec![1.0, 1.0],  // ~0.707
		]).unwrap()
	}

	#[test]
	fn threshold_is_inclusive() {
		let hits = retrieve_semantic_with_vector(&table(), &[1.0, 0.0], 10, 0.6).unwrap();
		let ids: Vec<usize> = hits.iter().map(|h| h.doc_id).collect();
		assert_eq!(ids, vec![1, 3, 0], "candidate exactly at 0.6 is kept");
		for h in &hits { assert!(h.score >= 0.6); }
	}

	#[test]
	fn threshold_applies_after_top_k() {
		let hits = retrieve_semantic_with_vector(&table(), &[1.0, 0.0], 2, 0.5).unwrap();
		let ids: Vec<usize> = hits.iter().map(|h| h.doc_id).collect();
		assert_eq!(ids, vec![1, 3], "doc 0 passes the threshold but falls outside top-2");
	}

	#[test]
	fn dimension_mismatch_is_an_embedding_error() {
		let err = retrieve_semantic_with_vector(&table(), &[1.0, 0.0, 0.0], 2, 0.5).unwrap_err();
		assert!(matches!(err, Error::Embedding(_)));
	}

	#[test]
	fn zero_norm_query_scores_zero() {
		let hits = retrieve_semantic_with_vector(&table(), &[0.0, 0.0], 4, -1.0).unwrap();
		assert_eq!(hits.len(), 4);
		assert!(hits.iter().all(|h| h.score == 0.0));
		let ids: Vec<usize> = hits.iter().map(|h| h.doc_id).collect();
		assert_eq!(ids, vec![0, 1, 2, 3], "ties keep id order");
	}
}

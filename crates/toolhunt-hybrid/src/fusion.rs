use std::collections::HashSet;

use tracing::debug;

use toolhunt_core::traits::Embedder;
use toolhunt_core::types::{FusionPolicy, RankedResult, ScoredCandidate};
use toolhunt_core::{DocumentStore, Error, Result};
use toolhunt_vector::{cosine_similarity, embed_checked};

/// Semantic candidates in their order, then lexical candidates not seen yet.
///
/// Semantic entries keep their similarity; lexical-only entries carry no score.
pub fn union_candidates(semantic: &[ScoredCandidate], lexical: &[ScoredCandidate]) -> Vec<RankedResult> {
    let mut seen = HashSet::with_capacity(semantic.len() + lexical.len());
    let mut merged = Vec::with_capacity(semantic.len() + lexical.len());
    for c in semantic {
        if seen.insert(c.doc_id) { merged.push(RankedResult { doc_id: c.doc_id, fused_score: Some(c.score) }); }
    }
    for c in lexical {
        if seen.insert(c.doc_id) { merged.push(RankedResult { doc_id: c.doc_id, fused_score: None }); }
    }
    merged
}

/// Re-embed every merged candidate as `name:<name> description:<description>`
/// in one batch and order by cosine similarity to the query, descending.
/// The sort is stable, so equal scores keep first-seen order.
pub fn rescore(merged: &[RankedResult], store: &DocumentStore, query_vec: &[f32], embedder: &dyn Embedder) -> Result<Vec<RankedResult>> {
    if merged.is_empty() { return Ok(Vec::new()); }
    let texts = merged
        .iter()
        .map(|r| {
            store
                .record(r.doc_id)
                .map(|rec| rec.rescore_text())
                .ok_or_else(|| Error::InternalConsistency(format!("candidate {} has no catalog record", r.doc_id)))
        })
        .collect::<Result<Vec<_>>>()?;
    let vectors = embed_checked(embedder, &texts)?;
    let mut rescored: Vec<RankedResult> = merged
        .iter()
        .zip(&vectors)
        .map(|(r, v)| RankedResult { doc_id: r.doc_id, fused_score: Some(cosine_similarity(query_vec, v)) })
        .collect();
    rescored.sort_by(|a, b| score_of(b).total_cmp(&score_of(a)));
    Ok(rescored)
}

fn score_of(r: &RankedResult) -> f32 { r.fused_score.unwrap_or(f32::NEG_INFINITY) }

/// Merge both retrievers' candidates under `policy`.
pub fn fuse(
    policy: FusionPolicy,
    lexical: &[ScoredCandidate],
    semantic: &[ScoredCandidate],
    store: &DocumentStore,
    query_vec: &[f32],
    embedder: &dyn Embedder,
) -> Result<Vec<RankedResult>> {
    let merged = union_candidates(semantic, lexical);
    debug!(?policy, semantic = semantic.len(), lexical = lexical.len(), merged = merged.len(), "fusing candidates");
    match policy {
        FusionPolicy::SetUnion => Ok(merged),
        FusionPolicy::Rescore => rescore(&merged, store, query_vec, embedder),
    }
}

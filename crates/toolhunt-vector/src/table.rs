use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};

use toolhunt_core::traits::Embedder;
use toolhunt_core::types::{DocId, Document};
use toolhunt_core::{Error, Result};

use crate::cache::{content_hash, CacheEntry, EmbeddingCache};
use crate::embed::embed_checked;

const EMBED_BATCH: usize = 64;

/// Cosine similarity; `0.0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    dot / (na.sqrt() * nb.sqrt())
}

/// Precomputed document embeddings; row `i` belongs to document id `i`.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl EmbeddingTable {
    /// Embed every document, reusing cached vectors when a cache is given.
    pub fn build(docs: &[Document], embedder: &dyn Embedder, cache: Option<&EmbeddingCache>, show_progress: bool) -> Result<Self> {
        for (i, d) in docs.iter().enumerate() {
            if d.id != i {
                return Err(Error::InternalConsistency(format!("document at position {} has id {}", i, d.id)));
            }
        }
        let dim = embedder.dim();
        let hashes: Vec<String> = docs.iter().map(|d| content_hash(&d.text)).collect();
        let cached = cache.map(|c| c.get_many(embedder.id(), dim, &hashes)).unwrap_or_default();

        let mut vectors: Vec<Option<Vec<f32>>> = hashes.iter().map(|h| cached.get(h).cloned()).collect();
        let misses: Vec<usize> = (0..docs.len()).filter(|&i| vectors[i].is_none()).collect();

        let pb = if show_progress && !misses.is_empty() { ProgressBar::new(misses.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tools ({percent}%)") {
            pb.set_style(style.progress_chars("#>-"));
        }
        let mut fresh = Vec::with_capacity(misses.len());
        for chunk in misses.chunks(EMBED_BATCH) {
            let texts: Vec<String> = chunk.iter().map(|&i| docs[i].text.clone()).collect();
            let embs = embed_checked(embedder, &texts)?;
            for (&i, v) in chunk.iter().zip(embs) {
                fresh.push(CacheEntry::new(hashes[i].clone(), embedder.id(), v.clone()));
                vectors[i] = Some(v);
            }
            pb.inc(chunk.len() as u64);
        }
        pb.finish_and_clear();

        if let Some(c) = cache {
            if let Err(e) = c.put_many(&fresh) { warn!(error = %e, "embedding cache write failed"); }
        }
        let vectors = vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| Error::InternalConsistency(format!("document {} left without an embedding", i))))
            .collect::<Result<Vec<_>>>()?;
        info!(docs = docs.len(), cached = docs.len() - misses.len(), embedded = misses.len(), "embedding table built");
        Ok(Self { dim, vectors })
    }

    /// Table from already computed vectors, all of the same length.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
            return Err(Error::Embedding(format!("vector {} has {} dims, expected {}", bad, vectors[bad].len(), dim)));
        }
        Ok(Self { dim, vectors })
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    pub fn get(&self, id: DocId) -> Option<&[f32]> { self.vectors.get(id).map(Vec::as_slice) }

    /// The `k` most similar rows, descending; ties keep the lower id first.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<(DocId, f32)> {
        let mut scored: Vec<(DocId, f32)> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(id, v)| (id, cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        scored
    }
}

use crate::types::{Document, ScoredCandidate};

/// Injected embedding capability: `text -> vector`.
///
/// Implementations must be deterministic for a given `id()` and return one
/// vector of length `dim()` per input text.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model, used as embedding cache key.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Injected lexical-scoring capability.
pub trait TextIndexer: Send + Sync {
    fn index(&self, docs: &[Document]) -> anyhow::Result<()>;
    /// Candidates descending by lexical score, at most `k`.
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<ScoredCandidate>>;
}

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use toolhunt_core::config::EngineConfig;
use toolhunt_core::traits::{Embedder, TextIndexer};
use toolhunt_core::types::{FusionPolicy, RankedResult, ToolRecord};
use toolhunt_core::{DocumentStore, Error, Result};
use toolhunt_text::retrieve_lexical;
use toolhunt_vector::{embed_query, retrieve_semantic_with_vector, EmbeddingCache, EmbeddingTable};

use crate::fusion::fuse;
use crate::resolve::resolve;

/// Optional inputs to [`HybridEngine::build`].
#[derive(Default, Clone, Copy)]
pub struct BuildOptions<'a> {
    /// Reuse and fill cached document embeddings.
    pub cache: Option<&'a EmbeddingCache>,
    pub show_progress: bool,
}

/// Lexical index, embedding table and document store for one catalog snapshot.
///
/// Everything is read-only after [`HybridEngine::build`]; share it behind an `Arc`.
pub struct HybridEngine<TI: TextIndexer> {
    store: DocumentStore,
    text: TI,
    vectors: EmbeddingTable,
    embedder: Arc<dyn Embedder>,
    config: EngineConfig,
}

impl<TI: TextIndexer> HybridEngine<TI> {
    /// Index `store` lexically and embed every document.
    ///
    /// `text` is reindexed from scratch, so building twice from the same
    /// inputs gives the same engine.
    pub fn build(store: DocumentStore, text: TI, embedder: Arc<dyn Embedder>, config: EngineConfig, opts: BuildOptions<'_>) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();
        text.index(store.documents())
            .map_err(|e| Error::IndexUnavailable(format!("lexical index build failed: {:#}", e)))?;
        let vectors = EmbeddingTable::build(store.documents(), embedder.as_ref(), opts.cache, opts.show_progress)?;
        info!(
            docs = store.len(),
            embedder = embedder.id(),
            policy = ?config.policy,
            ms = start.elapsed().as_millis() as u64,
            "hybrid engine built"
        );
        Ok(Self { store, text, vectors, embedder, config })
    }

    pub fn store(&self) -> &DocumentStore { &self.store }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Ranked identifiers for `query` under the configured policy.
    pub fn rank(&self, query: &str) -> Result<Vec<RankedResult>> { self.rank_with(query, self.config.policy) }

    /// Ranked identifiers for `query` under an explicit policy.
    pub fn rank_with(&self, query: &str, policy: FusionPolicy) -> Result<Vec<RankedResult>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() { return Err(Error::EmptyQuery); }
        let start = Instant::now();
        let query_vec = embed_query(self.embedder.as_ref(), &query)?;
        let (lexical, semantic) = rayon::join(
            || retrieve_lexical(&self.text, &query, self.config.lexical_limit),
            || retrieve_semantic_with_vector(&self.vectors, &query_vec, self.config.semantic_k, self.config.similarity_threshold),
        );
        let (lexical, semantic) = (lexical?, semantic?);
        let ranked = fuse(policy, &lexical, &semantic, &self.store, &query_vec, self.embedder.as_ref())?;
        debug!(
            lexical = lexical.len(),
            semantic = semantic.len(),
            results = ranked.len(),
            ms = start.elapsed().as_millis() as u64,
            "query ranked"
        );
        Ok(ranked)
    }

    /// Catalog records for `query` in final relevance order.
    pub fn search(&self, query: &str) -> Result<Vec<ToolRecord>> {
        let ranked = self.rank(query)?;
        resolve(&ranked, &self.store)
    }
}

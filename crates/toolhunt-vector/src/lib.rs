//! toolhunt-vector
//!
//! Semantic retrieval: per-document embeddings held in memory, cosine
//! similarity top-k followed by a similarity threshold, and a file-backed
//! embedding cache that survives restarts until the catalog changes.

pub mod cache;
pub mod embed;
pub mod search;
pub mod table;

pub use cache::{content_hash, CacheEntry, EmbeddingCache};
pub use embed::{embed_checked, embed_query};
pub use search::{retrieve_semantic, retrieve_semantic_with_vector};
pub use table::{cosine_similarity, EmbeddingTable};


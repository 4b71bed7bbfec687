//! Domain types shared by the lexical, semantic and fusion stages.

use serde::{Deserialize, Serialize};

/// Stable position of a document inside one [`crate::DocumentStore`] snapshot.
pub type DocId = usize;

/// Searchable view of a catalog row.
///
/// - `id`: position of the row in the snapshot, shared by every retriever
/// - `text`: lowercased `"<name> <description>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub text: String,
}

/// A catalog row as stored by the catalog collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

impl ToolRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), url: url.into() }
    }

    /// Text used by the lexical index and the document embedding table.
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.name, self.description).to_lowercase()
    }

    /// Text embedded by the rescore fusion policy.
    pub fn rescore_text(&self) -> String {
        format!("name:{} description:{}", self.name, self.description)
    }
}

/// Indicates which retriever produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Semantic,
}

/// The minimal surface returned by both retrievers.
///
/// `score` is retriever-specific (BM25 or cosine similarity); higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub doc_id: DocId,
    pub score: f32,
    pub source: SourceKind,
}

impl ScoredCandidate {
    pub fn lexical(doc_id: DocId, score: f32) -> Self { Self { doc_id, score, source: SourceKind::Lexical } }
    pub fn semantic(doc_id: DocId, score: f32) -> Self { Self { doc_id, score, source: SourceKind::Semantic } }
}

/// One entry of the final ordering.
///
/// `fused_score` is `None` for lexical-only hits under [`FusionPolicy::SetUnion`],
/// which have no score comparable to cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub doc_id: DocId,
    pub fused_score: Option<f32>,
}

/// How lexical and semantic candidates are merged into one ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPolicy {
    /// Semantic hits in similarity order, then unseen lexical hits in BM25 order.
    SetUnion,
    /// Union as above, then re-embed every candidate and sort by one cosine score.
    #[default]
    Rescore,
}

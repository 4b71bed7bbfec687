use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use toolhunt_core::traits::TextIndexer;
use toolhunt_core::types::ToolRecord;
use toolhunt_core::{Error, Result};

use crate::engine::HybridEngine;

pub const NO_QUERY_MESSAGE: &str = "No query provided";
pub const SEARCH_FAILED_MESSAGE: &str = "search failed";

/// Caller-facing view of a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolView {
    pub name: String,
    pub description: String,
    pub link: String,
}

impl From<&ToolRecord> for ToolView {
    fn from(r: &ToolRecord) -> Self {
        Self { name: r.name.clone(), description: r.description.clone(), link: r.url.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    BadRequest,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Results { results: Vec<ToolView> },
    Error { error: String },
}

impl SearchResponse {
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "response serialization failed");
                format!("{{\"error\":\"{}\"}}", SEARCH_FAILED_MESSAGE)
            }
        }
    }
}

/// Answers queries against the most recently published engine.
///
/// Publishing swaps an `Arc`; queries already running keep the engine they
/// started with.
pub struct SearchService<TI: TextIndexer> {
    engine: RwLock<Option<Arc<HybridEngine<TI>>>>,
}

impl<TI: TextIndexer> Default for SearchService<TI> {
    fn default() -> Self { Self { engine: RwLock::new(None) } }
}

impl<TI: TextIndexer> SearchService<TI> {
    pub fn new() -> Self { Self::default() }

    pub fn with_engine(engine: HybridEngine<TI>) -> Self { Self { engine: RwLock::new(Some(Arc::new(engine))) } }

    /// Make `engine` visible to new queries; returns the engine it replaced.
    pub fn publish(&self, engine: HybridEngine<TI>) -> Option<Arc<HybridEngine<TI>>> {
        let docs = engine.store().len();
        let previous = self.engine.write().replace(Arc::new(engine));
        info!(docs, replaced = previous.is_some(), "search engine published");
        previous
    }

    pub fn engine(&self) -> Option<Arc<HybridEngine<TI>>> { self.engine.read().clone() }

    pub fn search(&self, query: &str) -> Result<Vec<ToolRecord>> {
        if query.trim().is_empty() { return Err(Error::EmptyQuery); }
        let engine = self.engine().ok_or_else(|| Error::IndexUnavailable("no engine has been published".into()))?;
        engine.search(query)
    }

    /// Status and body for one request.
    pub fn handle(&self, query: &str) -> (ResponseStatus, SearchResponse) {
        match self.search(query) {
            Ok(records) => {
                debug!(results = records.len(), "search answered");
                (ResponseStatus::Ok, SearchResponse::Results { results: records.iter().map(ToolView::from).collect() })
            }
            Err(Error::EmptyQuery) => (ResponseStatus::BadRequest, SearchResponse::Error { error: NO_QUERY_MESSAGE.to_string() }),
            Err(e) => {
                error!(error = %e, "search failed");
                (ResponseStatus::Failed, SearchResponse::Error { error: SEARCH_FAILED_MESSAGE.to_string() })
            }
        }
    }
}

//! toolhunt-hybrid
//!
//! Runs the lexical and semantic retrievers side by side, fuses their
//! candidates under a [`FusionPolicy`](toolhunt_core::types::FusionPolicy) and
//! resolves the ranking back to catalog records.

pub mod engine;
pub mod fusion;
pub mod resolve;
pub mod service;

pub use engine::{BuildOptions, HybridEngine};
pub use fusion::{fuse, rescore, union_candidates};
pub use resolve::resolve;
pub use service::{ResponseStatus, SearchResponse, SearchService, ToolView};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Internal consistency violated: {0}")]
    InternalConsistency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::{Catalog, DocumentStore};
pub use error::{Error, Result};

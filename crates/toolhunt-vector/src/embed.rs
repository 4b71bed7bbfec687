use toolhunt_core::traits::Embedder;
use toolhunt_core::{Error, Result};

/// Call the embedder and check its output: one finite vector of `dim()`
/// components per input. Any failure is an [`Error::Embedding`].
pub fn embed_checked(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() { return Ok(Vec::new()); }
    let vectors = embedder
        .embed_batch(texts)
        .map_err(|e| Error::Embedding(format!("{} failed on {} text(s): {:#}", embedder.id(), texts.len(), e)))?;
    if vectors.len() != texts.len() {
        return Err(Error::Embedding(format!("{} returned {} vectors for {} texts", embedder.id(), vectors.len(), texts.len())));
    }
    let dim = embedder.dim();
    for (i, v) in vectors.iter().enumerate() {
        if v.len() != dim {
            return Err(Error::Embedding(format!("vector {} has {} dims, expected {}", i, v.len(), dim)));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(Error::Embedding(format!("vector {} has non-finite components", i)));
        }
    }
    Ok(vectors)
}

pub fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>> {
    let mut vectors = embed_checked(embedder, &[query.to_string()])?;
    vectors.pop().ok_or_else(|| Error::Embedding("no query vector returned".to_string()))
}

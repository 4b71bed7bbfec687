//! toolhunt-embed
//!
//! Embedding backends behind `toolhunt_core::traits::Embedder`: a local
//! sentence-transformers BERT model run with candle, and a hashing embedder
//! for tests and offline runs.

pub mod device;
pub mod pool;
pub mod tokenize;

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

use toolhunt_core::config::{expand_path, EmbeddingConfig};
pub use toolhunt_core::traits::Embedder;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L12-v2";

/// Sentence embedding model (`all-MiniLM-L12-v2` or any BERT checkpoint in the
/// same layout): mean pooling over tokens, L2-normalized.
pub struct BertEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, max_len: usize, dim: usize, id: String }

impl BertEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw.get("hidden_size").and_then(|v| v.as_u64()).ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "bert".to_string());
        let id = format!("bert:{}:d{}:t{}", name, dim, max_len);
        info!(id = %id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, max_len, dim, id })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("model returned {} dims, expected {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { warn!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { texts.iter().map(|t| self.embed_text(t)).collect() }
}

/// Deterministic bag-of-words embedding: each token is hashed with xxHash64
/// into one of `dim` buckets, then the vector is L2-normalized.
///
/// Texts sharing tokens have positive cosine similarity; disjoint texts score
/// near zero. No model files needed.
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("hash:xxh64:d{}", dim) } }

    /// Empty for a zero-dimension embedder.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 { return Vec::new(); }
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

/// The hash embedder when configured (or `APP_USE_FAKE_EMBEDDINGS=1`), the
/// BERT model from the resolved model directory otherwise.
pub fn get_default_embedder(cfg: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if cfg.use_hash_embeddings || env_fake {
        if cfg.hash_dim == 0 { return Err(anyhow!("embedding.hash_dim must be greater than 0")); }
        info!(dim = cfg.hash_dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(cfg.hash_dim)));
    }
    let dir = resolve_model_dir(cfg)?;
    Ok(Box::new(BertEmbedder::load(&dir, cfg.max_len)?))
}

fn resolve_model_dir(cfg: &EmbeddingConfig) -> Result<PathBuf> {
    if let Some(dir) = &cfg.model_dir { let p = expand_path(dir); if p.exists() { return Ok(p); } warn!(dir = %p.display(), "configured model dir does not exist"); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = expand_path(&dir); if p.exists() { debug!(var, dir = %p.display(), "model dir from env"); return Ok(p); } }
    }
    let fallback = Path::new(DEFAULT_MODEL_DIR); if fallback.exists() { return Ok(fallback.to_path_buf()); }
    Err(anyhow!("Could not locate embedding model directory (set embedding.model_dir or APP_MODEL_DIR)"))
}

//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge defaults + `toolhunt.toml` + `toolhunt.<env>.toml` +
//! `TOOLHUNT_*` env vars into an [`AppConfig`].

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::FusionPolicy;

/// Retrieval and fusion knobs for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: FusionPolicy,
    /// Top-k kept by the semantic retriever before threshold filtering.
    pub semantic_k: usize,
    /// Inclusive minimum cosine similarity for semantic candidates.
    pub similarity_threshold: f32,
    /// Cap on lexical candidates.
    pub lexical_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { policy: FusionPolicy::default(), semantic_k: 20, similarity_threshold: 0.5, lexical_limit: 10 }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.semantic_k == 0 {
            return Err(Error::InvalidConfig("engine.semantic_k must be greater than 0".into()));
        }
        if self.lexical_limit == 0 {
            return Err(Error::InvalidConfig("engine.lexical_limit must be greater than 0".into()));
        }
        if !self.similarity_threshold.is_finite() || !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig(format!(
                "engine.similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self { Self { path: "data/tools.csv".to_string() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub use_hash_embeddings: bool,
    pub hash_dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self { Self { model_dir: None, max_len: 128, use_hash_embeddings: false, hash_dim: 384 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self { Self { enabled: true, path: "data/embedding_cache.json".to_string() } }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub embedding: EmbeddingConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        self.engine.validate()?;
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be greater than 0".into()));
        }
        if self.embedding.hash_dim == 0 {
            return Err(Error::InvalidConfig("embedding.hash_dim must be greater than 0".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Defaults, then `toolhunt.toml`, then `toolhunt.<env>.toml`, then
    /// `TOOLHUNT_*` variables (`__` separates nested keys).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file("toolhunt.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("toolhunt.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("toolhunt.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("toolhunt.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("TOOLHUNT_").split("__"));

        let config = Self { figment };
        config.app()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The full typed configuration, validated.
    pub fn app(&self) -> anyhow::Result<AppConfig> {
        let app: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract configuration: {}", e))?;
        app.validate()?;
        Ok(app)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

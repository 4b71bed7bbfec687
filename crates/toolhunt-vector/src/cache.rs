//! File-backed embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Consulted before calling an embedder and written through on misses.
//! Deleting the file with [`EmbeddingCache::invalidate`] forces every document
//! to be re-embedded on the next build.

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub vector: Vec<f32>,
}

impl CacheEntry {
    pub fn new(content_hash: String, embedder_id: &str, vector: Vec<f32>) -> Self {
        Self { content_hash, embedder_id: embedder_id.to_string(), created_at: Utc::now().timestamp_millis(), vector }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    entries: Vec<CacheEntry>,
}

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    path: PathBuf,
}

impl EmbeddingCache {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn read(&self) -> CacheFile {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheFile::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "embedding cache unreadable, ignoring");
                return CacheFile::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable embedding cache, ignoring");
                CacheFile::default()
            }
        }
    }

    /// Cached vectors for the requested hashes. Entries from another embedder
    /// or with a length other than `dim` are skipped.
    pub fn get_many(&self, embedder_id: &str, dim: usize, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        let wanted: std::collections::HashSet<&str> = hashes.iter().map(String::as_str).collect();
        let out: HashMap<String, Vec<f32>> = self
            .read()
            .entries
            .into_iter()
            .filter(|e| e.embedder_id == embedder_id && e.vector.len() == dim && wanted.contains(e.content_hash.as_str()))
            .map(|e| (e.content_hash, e.vector))
            .collect();
        debug!(requested = hashes.len(), hits = out.len(), "embedding cache lookup");
        out
    }

    /// Merge `entries` into the file, replacing entries with the same key.
    /// Within one batch the last entry for a key wins.
    pub fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        if entries.is_empty() { return Ok(()); }
        let mut batch: Vec<CacheEntry> = Vec::with_capacity(entries.len());
        let mut slots: HashMap<(&str, &str), usize> = HashMap::with_capacity(entries.len());
        for e in entries {
            match slots.get(&(e.content_hash.as_str(), e.embedder_id.as_str())) {
                Some(&i) => batch[i] = e.clone(),
                None => {
                    slots.insert((e.content_hash.as_str(), e.embedder_id.as_str()), batch.len());
                    batch.push(e.clone());
                }
            }
        }
        let mut file = self.read();
        file.entries.retain(|e| !slots.contains_key(&(e.content_hash.as_str(), e.embedder_id.as_str())));
        file.entries.extend(batch);

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(tmp.as_file_mut(), &file)?;
        tmp.as_file_mut().flush()?;
        tmp.persist(&self.path).map_err(|e| anyhow!("persist {}: {}", self.path.display(), e.error))?;
        debug!(added = entries.len(), total = file.entries.len(), "embedding cache written");
        Ok(())
    }

    /// Delete the cache file. Returns whether a file was removed.
    pub fn invalidate(&self) -> Result<bool> {
        if !self.path.exists() { return Ok(false); }
        fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "embedding cache invalidated");
        Ok(true)
    }
}

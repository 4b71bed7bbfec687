use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{DocId, Document, ToolRecord};

/// Mutable list of tools owned by the catalog collaborator.
///
/// The engine never sees a `Catalog` directly; it is handed an immutable
/// [`DocumentStore`] taken with [`Catalog::snapshot`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<ToolRecord>,
}

impl Catalog {
    pub fn new() -> Self { Self::default() }

    pub fn from_records(records: Vec<ToolRecord>) -> Self { Self { records } }

    /// Read `name,description,url` rows. There is no header row and short rows
    /// are accepted; absent fields become empty strings. A missing file is an
    /// empty catalog.
    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "catalog file not found, starting empty");
            return Ok(Self::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::Catalog(format!("open {}: {}", path.display(), e)))?;
        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| Error::Catalog(format!("read {} row {}: {}", path.display(), line + 1, e)))?;
            let field = |i: usize| row.get(i).unwrap_or("").trim().to_string();
            let name = field(0);
            if name.is_empty() {
                debug!(row = line + 1, "skipping catalog row without a name");
                continue;
            }
            records.push(ToolRecord { name, description: field(1), url: field(2) });
        }
        info!(path = %path.display(), tools = records.len(), "catalog loaded");
        Ok(Self { records })
    }

    /// Write the catalog next to `path` and rename it into place.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::Catalog(format!("create {}: {}", dir.display(), e)))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::Catalog(format!("temp file in {}: {}", dir.display(), e)))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            for r in &self.records {
                writer
                    .write_record([r.name.as_str(), r.description.as_str(), r.url.as_str()])
                    .map_err(|e| Error::Catalog(format!("write row '{}': {}", r.name, e)))?;
            }
            writer.flush().map_err(|e| Error::Catalog(format!("flush: {}", e)))?;
        }
        tmp.as_file_mut().flush().map_err(|e| Error::Catalog(format!("flush: {}", e)))?;
        tmp.persist(path).map_err(|e| Error::Catalog(format!("persist {}: {}", path.display(), e.error)))?;
        debug!(path = %path.display(), tools = self.records.len(), "catalog saved");
        Ok(())
    }

    /// Append a tool unless one with the same case-insensitive name exists.
    ///
    /// Returns `Ok(false)` when the tool was skipped as a duplicate.
    pub fn insert(&mut self, name: &str, description: &str, url: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Catalog("tool name cannot be empty or whitespace-only".to_string()));
        }
        let lowered = name.to_lowercase();
        if self.records.iter().any(|r| r.name.trim().to_lowercase() == lowered) {
            info!(name, "skipped duplicate tool");
            return Ok(false);
        }
        self.records.push(ToolRecord::new(name, description.trim(), url.trim()));
        debug!(name, "tool added to catalog");
        Ok(true)
    }

    pub fn records(&self) -> &[ToolRecord] { &self.records }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Freeze the current rows into a document store for one engine build.
    pub fn snapshot(&self) -> DocumentStore { DocumentStore::new(self.records.clone()) }
}

/// Immutable corpus: catalog rows plus their searchable documents.
///
/// Document `i` always describes record `i`.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    records: Vec<ToolRecord>,
    documents: Vec<Document>,
}

impl DocumentStore {
    pub fn new(records: Vec<ToolRecord>) -> Self {
        let documents = records
            .iter()
            .enumerate()
            .map(|(id, r)| Document { id, text: r.searchable_text() })
            .collect();
        Self { records, documents }
    }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn record(&self, id: DocId) -> Option<&ToolRecord> { self.records.get(id) }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

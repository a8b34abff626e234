//! Persistence boundary for parsed documents and their relationships.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use mdxld::{Document, Relationship};

use crate::error::IndexError;

/// Outcome of saving a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveResult {
    Created,
    Updated,
    Unchanged,
}

/// Receives documents and relationships produced by the indexer.
///
/// Saving a changed document invalidates the relationships previously
/// ingested from it. Ingesting replaces, per source id, whatever edges were
/// held for that source.
pub trait Store {
    fn save(&mut self, id: &str, doc: &Document) -> Result<SaveResult, IndexError>;

    fn ingest(&mut self, relationships: &[Relationship]) -> Result<(), IndexError>;

    /// Drop a document and its outgoing relationships. Unknown ids are ignored.
    fn remove(&mut self, id: &str) -> Result<(), IndexError>;
}

/// In-memory store that can be written out as JSON.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: BTreeMap<String, Document>,
    relationships: BTreeMap<String, Vec<Relationship>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.documents.iter().map(|(id, doc)| (id.as_str(), doc))
    }

    /// All relationships, grouped by source id.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values().flatten()
    }

    /// Outgoing relationships of one document.
    pub fn relationships_from(&self, id: &str) -> &[Relationship] {
        self.relationships.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Write `documents.json` and `relationships.json` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir).map_err(|source| IndexError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let relationships: Vec<&Relationship> = self.relationships().collect();
        write_json(&dir.join("documents.json"), &self.documents)?;
        write_json(&dir.join("relationships.json"), &relationships)?;

        tracing::info!(
            "Wrote {} documents and {} relationships to {}",
            self.documents.len(),
            relationships.len(),
            dir.display()
        );
        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IndexError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| IndexError::Store(e.to_string()))?;
    fs::write(path, json).map_err(|source| IndexError::Write {
        path: path.to_path_buf(),
        source,
    })
}

impl Store for MemoryStore {
    fn save(&mut self, id: &str, doc: &Document) -> Result<SaveResult, IndexError> {
        let result = match self.documents.get(id) {
            None => SaveResult::Created,
            Some(existing) if existing == doc => return Ok(SaveResult::Unchanged),
            Some(_) => SaveResult::Updated,
        };

        self.relationships.remove(id);
        self.documents.insert(id.to_string(), doc.clone());
        Ok(result)
    }

    fn ingest(&mut self, relationships: &[Relationship]) -> Result<(), IndexError> {
        let mut grouped: BTreeMap<&str, Vec<Relationship>> = BTreeMap::new();
        for rel in relationships {
            grouped.entry(rel.from.as_str()).or_default().push(rel.clone());
        }
        for (from, edges) in grouped {
            self.relationships.insert(from.to_string(), edges);
        }
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<(), IndexError> {
        self.documents.remove(id);
        self.relationships.remove(id);
        Ok(())
    }
}

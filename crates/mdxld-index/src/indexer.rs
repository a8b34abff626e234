//! Batch indexing of a docs directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use mdxld::{extract_relationships, try_parse, Document, ExtractOptions, Mode, Relationship};

use crate::error::IndexError;
use crate::loader::{FsLoader, Loader};
use crate::store::Store;

/// Configuration for indexing a docs directory.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Source docs directory
    pub docs_dir: PathBuf,

    /// File extensions to index, without the dot
    pub extensions: Vec<String>,

    pub mode: Mode,

    /// Fail on malformed frontmatter instead of indexing the file as body text
    pub strict: bool,

    /// Base URL documents are published under
    pub base_url: Option<String>,

    pub include_images: bool,
    pub include_imports: bool,
    pub include_embeds: bool,
    pub internal_only: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
            extensions: vec!["md".to_string(), "mdx".to_string()],
            mode: Mode::Expanded,
            strict: false,
            base_url: None,
            include_images: true,
            include_imports: true,
            include_embeds: true,
            internal_only: false,
        }
    }
}

impl IndexConfig {
    /// Whether a path has one of the configured extensions.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Result of an indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResult {
    /// Number of documents saved
    pub documents: usize,

    /// Number of relationships ingested
    pub relationships: usize,

    /// Total time in milliseconds
    pub duration_ms: u64,
}

/// A parsed file ready to be stored.
#[derive(Debug)]
struct Indexed {
    path: PathBuf,
    id: String,
    doc: Document,
    relationships: Vec<Relationship>,
}

/// Walks a docs directory, parses every document and feeds a [`Store`].
pub struct Indexer<L = FsLoader> {
    config: IndexConfig,
    loader: L,
    /// Source id each file (relative to the docs directory) was last stored under
    ids: Mutex<HashMap<PathBuf, String>>,
}

impl Indexer<FsLoader> {
    pub fn new(config: IndexConfig) -> Self {
        Self::with_loader(config, FsLoader)
    }
}

impl<L: Loader> Indexer<L> {
    pub fn with_loader(config: IndexConfig, loader: L) -> Self {
        Self {
            config,
            loader,
            ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Index every matching file under the docs directory.
    pub fn index(&self, store: &mut impl Store) -> Result<IndexResult, IndexError> {
        let start = Instant::now();
        let paths = self.discover()?;

        let results: Vec<Result<Indexed, IndexError>> =
            paths.par_iter().map(|path| self.index_path(path)).collect();

        let mut documents = 0;
        let mut relationships = 0;
        for result in results {
            if let Some(count) = self.commit(result?, store)? {
                relationships += count;
                documents += 1;
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Indexed {} documents with {} relationships in {}ms",
            documents,
            relationships,
            duration_ms
        );

        Ok(IndexResult {
            documents,
            relationships,
            duration_ms,
        })
    }

    /// Re-index a single file, replacing whatever was stored for it before.
    pub fn index_file(
        &self,
        path: &Path,
        store: &mut impl Store,
    ) -> Result<IndexResult, IndexError> {
        let start = Instant::now();
        let indexed = self.index_path(path)?;
        let committed = self.commit(indexed, store)?;

        Ok(IndexResult {
            documents: usize::from(committed.is_some()),
            relationships: committed.unwrap_or(0),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Forget a file that no longer exists.
    pub fn remove_file(&self, path: &Path, store: &mut impl Store) -> Result<(), IndexError> {
        let relative = self.relative(path);
        let mut ids = self.lock_ids();
        let id = match ids.remove(&relative) {
            Some(id) => id,
            None => {
                let id = self.path_id(&relative);
                if let Some(owner) = claimant(&ids, &id, &relative) {
                    tracing::debug!("Keeping {}, stored for {}", id, owner.display());
                    return Ok(());
                }
                id
            }
        };
        drop(ids);
        tracing::debug!("Removing {} ({})", id, path.display());
        store.remove(&id)
    }

    /// Find all matching files under the docs directory, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, IndexError> {
        let docs_dir = &self.config.docs_dir;
        if !docs_dir.exists() {
            return Err(IndexError::NotFound(docs_dir.clone()));
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(docs_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.config.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Source id of a document: its own identifier, or a URL path derived from
    /// where it lives under the docs directory.
    pub fn source_id(&self, path: &Path, doc: &Document) -> String {
        match doc.identifier() {
            Some(id) => id.to_string(),
            None => self.path_id(&self.relative(path)),
        }
    }

    fn index_path(&self, path: &Path) -> Result<Indexed, IndexError> {
        let source = self.loader.load(path)?;
        let doc = if self.config.strict {
            try_parse(&source, self.config.mode).map_err(|source| IndexError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            mdxld::parse(&source, self.config.mode)
        };

        let id = self.source_id(path, &doc);
        let relationships = self.extract(path, &doc, &id);

        Ok(Indexed {
            path: path.to_path_buf(),
            id,
            doc,
            relationships,
        })
    }

    fn extract(&self, path: &Path, doc: &Document, id: &str) -> Vec<Relationship> {
        let options = ExtractOptions {
            source_id: id.to_string(),
            base_url: self.document_url(path),
            include_images: self.config.include_images,
            include_imports: self.config.include_imports,
            include_embeds: self.config.include_embeds,
            internal_only: self.config.internal_only,
            created_at: None,
        };
        extract_relationships(doc, &options)
    }

    /// Store a parsed file. Returns the number of relationships ingested, or
    /// `None` when the file was skipped because its id belongs to another file.
    ///
    /// An `$id` already stored for a different file is kept by that file; the
    /// newcomer falls back to its path id.
    fn commit(
        &self,
        mut indexed: Indexed,
        store: &mut impl Store,
    ) -> Result<Option<usize>, IndexError> {
        let key = self.relative(&indexed.path);
        let mut ids = self.lock_ids();

        if let Some(owner) = claimant(&ids, &indexed.id, &key) {
            let fallback = self.path_id(&key);
            if let Some(other) = claimant(&ids, &fallback, &key) {
                tracing::warn!(
                    "Skipping {}: ids {} and {} are taken by {} and {}",
                    indexed.path.display(),
                    indexed.id,
                    fallback,
                    owner.display(),
                    other.display()
                );
                return Ok(None);
            }
            tracing::warn!(
                "Duplicate id {} in {} (already used by {}), indexing it as {}",
                indexed.id,
                indexed.path.display(),
                owner.display(),
                fallback
            );
            indexed.relationships = self.extract(&indexed.path, &indexed.doc, &fallback);
            indexed.id = fallback;
        }

        let previous = ids.insert(key, indexed.id.clone());
        drop(ids);
        if let Some(previous) = previous.filter(|p| *p != indexed.id) {
            store.remove(&previous)?;
        }

        let result = store.save(&indexed.id, &indexed.doc)?;
        store.ingest(&indexed.relationships)?;
        tracing::debug!(
            "{} {} ({:?}, {} relationships)",
            indexed.path.display(),
            indexed.id,
            result,
            indexed.relationships.len()
        );

        Ok(Some(indexed.relationships.len()))
    }

    fn lock_ids(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, String>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Path relative to the docs directory. Watch events report absolute
    /// paths, so the canonical docs directory is tried as well.
    fn relative(&self, path: &Path) -> PathBuf {
        let docs_dir = &self.config.docs_dir;
        if let Ok(relative) = path.strip_prefix(docs_dir) {
            return relative.to_path_buf();
        }
        docs_dir
            .canonicalize()
            .ok()
            .and_then(|root| path.strip_prefix(root).ok().map(Path::to_path_buf))
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// URL path for a file relative to the docs directory.
    ///
    /// `guide/intro.mdx` maps to `/guide/intro`, `guide/index.mdx` to
    /// `/guide/`, and the root `index.mdx` to `/`.
    fn path_id(&self, relative: &Path) -> String {
        let url = path_to_url(relative);
        match &self.config.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), url),
            None => url,
        }
    }

    /// Base for resolving a document's relative links.
    fn document_url(&self, path: &Path) -> Option<String> {
        self.config
            .base_url
            .as_ref()
            .map(|_| self.path_id(&self.relative(path)))
    }
}

/// The other file, if any, whose document is stored under `id`.
fn claimant(ids: &HashMap<PathBuf, String>, id: &str, key: &Path) -> Option<PathBuf> {
    ids.iter()
        .find(|(path, claimed)| claimed.as_str() == id && path.as_path() != key)
        .map(|(path, _)| path.clone())
}

fn path_to_url(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(|parent| parent.components())
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if stem == "index" {
        if segments.is_empty() {
            return "/".to_string();
        }
        return format!("/{}/", segments.join("/"));
    }

    segments.push(stem.to_string());
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mdxld::RelationshipType;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn config(docs: &Path) -> IndexConfig {
        IndexConfig {
            docs_dir: docs.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn maps_paths_to_urls() {
        assert_eq!(path_to_url(Path::new("index.mdx")), "/");
        assert_eq!(path_to_url(Path::new("intro.md")), "/intro");
        assert_eq!(path_to_url(Path::new("guide/index.mdx")), "/guide/");
        assert_eq!(path_to_url(Path::new("guide/setup.mdx")), "/guide/setup");
    }

    #[test]
    fn indexes_directory() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "index.mdx", "---\ntitle: Home\n---\n# Welcome\n\n[Guide](./guide/)\n");
        write(
            &docs,
            "guide/index.md",
            "---\n$id: https://example.com/guide\n---\n![diagram](./d.png)\n",
        );
        write(&docs, "notes.txt", "[ignored](./x)");

        let indexer = Indexer::new(config(&docs));
        let mut store = MemoryStore::new();
        let result = indexer.index(&mut store).unwrap();

        assert_eq!(result.documents, 2);
        assert_eq!(result.relationships, 2);
        assert!(store.get("/").is_some());
        assert!(store.get("https://example.com/guide").is_some());

        let guide = store.relationships_from("https://example.com/guide");
        assert_eq!(guide[0].kind, RelationshipType::Image);
        assert_eq!(guide[0].to, "./d.png");
    }

    #[test]
    fn resolves_links_against_document_urls() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "guide/setup.mdx", "[next](./deploy) [home](/)");

        let indexer = Indexer::new(IndexConfig {
            base_url: Some("https://docs.example.com/".to_string()),
            ..config(&docs)
        });
        let mut store = MemoryStore::new();
        indexer.index(&mut store).unwrap();

        let id = "https://docs.example.com/guide/setup";
        let targets: Vec<_> = store
            .relationships_from(id)
            .iter()
            .map(|r| r.to.as_str())
            .collect();
        assert_eq!(
            targets,
            vec![
                "https://docs.example.com/guide/deploy",
                "https://docs.example.com/"
            ]
        );
    }

    #[test]
    fn missing_docs_dir_is_an_error() {
        let temp = tempdir().unwrap();
        let indexer = Indexer::new(config(&temp.path().join("nope")));

        let err = indexer.index(&mut MemoryStore::new()).unwrap_err();

        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[test]
    fn lenient_mode_indexes_malformed_frontmatter_as_body() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "bad.mdx", "---\ntitle: [oops\n---\n[a](./a)\n");

        let mut store = MemoryStore::new();
        Indexer::new(config(&docs)).index(&mut store).unwrap();

        let doc = store.get("/bad").unwrap();
        assert!(doc.metadata().is_empty());
        assert!(doc.body().starts_with("---\n"));
    }

    #[test]
    fn strict_mode_reports_malformed_frontmatter() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "bad.mdx", "---\ntitle: [oops\n---\n");

        let indexer = Indexer::new(IndexConfig {
            strict: true,
            ..config(&docs)
        });
        let err = indexer.index(&mut MemoryStore::new()).unwrap_err();

        assert!(matches!(err, IndexError::Parse { .. }));
    }

    #[test]
    fn reindexes_a_single_file() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        let page = write(&docs, "page.mdx", "[a](./a) [b](./b)");

        let indexer = Indexer::new(config(&docs));
        let mut store = MemoryStore::new();
        indexer.index(&mut store).unwrap();
        assert_eq!(store.relationships_from("/page").len(), 2);

        fs::write(&page, "[c](./c)").unwrap();
        let result = indexer.index_file(&page, &mut store).unwrap();

        assert_eq!(result.relationships, 1);
        assert_eq!(store.relationships_from("/page")[0].to, "./c");
    }

    #[test]
    fn identifier_change_drops_the_old_entry() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        let page = write(&docs, "page.mdx", "---\n$id: urn:old\n---\n[a](./a)");

        let indexer = Indexer::new(config(&docs));
        let mut store = MemoryStore::new();
        indexer.index(&mut store).unwrap();

        fs::write(&page, "---\n$id: urn:new\n---\n[a](./a)").unwrap();
        indexer.index_file(&page, &mut store).unwrap();

        assert!(store.get("urn:old").is_none());
        assert!(store.get("urn:new").is_some());
        assert!(store.relationships_from("urn:old").is_empty());
    }

    #[test]
    fn removes_deleted_files() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        let page = write(&docs, "page.mdx", "---\n$id: urn:page\n---\n[a](./a)");

        let indexer = Indexer::new(config(&docs));
        let mut store = MemoryStore::new();
        indexer.index(&mut store).unwrap();

        fs::remove_file(&page).unwrap();
        indexer.remove_file(&page, &mut store).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_identifiers_fall_back_to_path_ids() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "a.mdx", "---\n$id: urn:same\n---\n[x](./x)");
        let b = write(&docs, "b.mdx", "---\n$id: urn:same\n---\n[y](./y)");

        let indexer = Indexer::new(config(&docs));
        let mut store = MemoryStore::new();
        let result = indexer.index(&mut store).unwrap();

        assert_eq!(result.documents, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.relationships_from("urn:same")[0].to, "./x");
        let fallback = store.relationships_from("/b");
        assert_eq!(fallback[0].to, "./y");
        assert_eq!(fallback[0].from, "/b");

        fs::write(&b, "---\n$id: urn:same\n---\n[z](./z)").unwrap();
        indexer.index_file(&b, &mut store).unwrap();
        assert_eq!(store.relationships_from("urn:same")[0].to, "./x");
        assert_eq!(store.relationships_from("/b")[0].to, "./z");

        fs::remove_file(&b).unwrap();
        indexer.remove_file(&b, &mut store).unwrap();
        assert!(store.get("urn:same").is_some());
        assert!(store.get("/b").is_none());
    }

    #[test]
    fn skips_files_whose_ids_are_all_taken() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "a.mdx", "---\n$id: /c\n---\n[x](./x)");
        write(&docs, "b.mdx", "---\n$id: urn:b\n---\n");
        write(&docs, "c.mdx", "---\n$id: urn:b\n---\n[y](./y)");

        let mut store = MemoryStore::new();
        let result = Indexer::new(config(&docs)).index(&mut store).unwrap();

        assert_eq!(result.documents, 2);
        assert_eq!(result.relationships, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.relationships_from("/c")[0].to, "./x");
    }

    #[test]
    fn uses_a_custom_loader() {
        struct Fixed;

        impl Loader for Fixed {
            fn load(&self, _path: &Path) -> Result<String, IndexError> {
                Ok("---\n$type: Note\n---\n<Video src=\"./v.mp4\" />\n".to_string())
            }
        }

        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        write(&docs, "a.mdx", "");

        let indexer = Indexer::with_loader(config(&docs), Fixed);
        let mut store = MemoryStore::new();
        let result = indexer.index(&mut store).unwrap();

        assert_eq!(result.relationships, 1);
        assert_eq!(
            store.relationships_from("/a")[0].kind,
            RelationshipType::Embed
        );
    }
}

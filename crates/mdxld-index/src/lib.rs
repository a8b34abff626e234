//! Loading, indexing and watching MDXLD documents on disk.
//!
//! The `mdxld` crate never touches the filesystem. This crate supplies the
//! pieces around it: a [`Loader`] for document text, a [`Store`] for parsed
//! documents and their relationships, an [`Indexer`] that walks a docs
//! directory in parallel, and a [`FileWatcher`] for incremental re-indexing.

pub mod error;
pub mod indexer;
pub mod loader;
pub mod store;
pub mod watcher;

pub use error::IndexError;
pub use indexer::{IndexConfig, IndexResult, Indexer};
pub use loader::{FsLoader, Loader};
pub use store::{MemoryStore, SaveResult, Store};
pub use watcher::{FileWatcher, WatchEvent};

//! Errors for loading, indexing and storing documents.

use std::path::PathBuf;

/// Errors that can occur while indexing.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Docs directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: mdxld::ParseError,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to watch files: {0}")]
    Watch(#[from] notify::Error),
}

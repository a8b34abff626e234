//! Document text sources.

use std::fs;
use std::path::Path;

use crate::error::IndexError;

/// Supplies raw document text for a path.
pub trait Loader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String, IndexError>;
}

/// Reads documents from the local filesystem as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, IndexError> {
        fs::read_to_string(path).map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

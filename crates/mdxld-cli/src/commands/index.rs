//! Batch indexing command.

use std::path::PathBuf;

use anyhow::Result;
use mdxld_index::{Indexer, MemoryStore};

use crate::config::ConfigFile;

/// Run the index command.
pub fn run(config: &ConfigFile, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.docs.output.clone());
    tracing::info!("Indexing {}...", config.docs.dir.display());

    let indexer = Indexer::new(config.index_config());
    let mut store = MemoryStore::new();
    let result = indexer.index(&mut store)?;
    store.write(&output)?;

    tracing::info!(
        "Indexed {} documents with {} relationships in {}ms",
        result.documents,
        result.relationships,
        result.duration_ms
    );
    tracing::info!("Output: {}", output.display());

    Ok(())
}

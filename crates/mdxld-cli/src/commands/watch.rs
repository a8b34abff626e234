//! Watch command: keep the graph up to date as documents change.

use std::path::PathBuf;

use anyhow::Result;
use mdxld_index::{FileWatcher, Indexer, MemoryStore, WatchEvent};

use crate::config::ConfigFile;

/// Run the watch command until interrupted.
pub async fn run(config: &ConfigFile, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.docs.output.clone());
    let indexer = Indexer::new(config.index_config());
    let mut store = MemoryStore::new();

    let result = indexer.index(&mut store)?;
    store.write(&output)?;
    tracing::info!(
        "Indexed {} documents, watching {} for changes",
        result.documents,
        config.docs.dir.display()
    );

    let (watcher, mut rx) =
        FileWatcher::new(&[config.docs.dir.clone()], config.docs.extensions.clone())?;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                if let Err(e) = handle_event(&indexer, &mut store, &event) {
                    tracing::warn!("Failed to update {}: {}", event.path().display(), e);
                    continue;
                }
                if let Err(e) = store.write(&output) {
                    tracing::warn!("{}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watcher");
                break;
            }
        }
    }

    // Keep watcher alive
    drop(watcher);
    Ok(())
}

fn handle_event(
    indexer: &Indexer,
    store: &mut MemoryStore,
    event: &WatchEvent,
) -> Result<(), mdxld_index::IndexError> {
    match event {
        WatchEvent::Changed(path) => {
            let result = indexer.index_file(path, store)?;
            tracing::info!(
                "Re-indexed {} ({} relationships)",
                path.display(),
                result.relationships
            );
        }
        WatchEvent::Removed(path) => {
            indexer.remove_file(path, store)?;
            tracing::info!("Removed {}", path.display());
        }
    }
    Ok(())
}

//! File watching for incremental re-indexing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use crate::error::IndexError;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Document was created or modified
    Changed(PathBuf),

    /// Document was deleted or moved away
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Recursive watcher over document files.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` for changes to files with one of `extensions`.
    ///
    /// Returns the watcher and a channel to receive events. Events stop when
    /// the watcher is dropped.
    pub fn new(
        paths: &[PathBuf],
        extensions: Vec<String>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), IndexError> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            match res {
                Ok(event) => {
                    let _ = sync_tx.send(event);
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })?;

        for path in paths {
            if path.exists() {
                watcher.watch(path, RecursiveMode::Recursive)?;
            } else {
                tracing::debug!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            let mut debouncer = Debouncer::default();

            loop {
                let ready = match sync_rx.recv_timeout(DEBOUNCE) {
                    Ok(event) => {
                        let now = Instant::now();
                        for path in event.paths {
                            if !has_extension(&path, &extensions) {
                                continue;
                            }
                            if let Some(watch_event) = classify_event(&path, &event.kind) {
                                debouncer.push(watch_event, now);
                            }
                        }
                        debouncer.drain_ready(now)
                    }
                    Err(RecvTimeoutError::Timeout) => debouncer.drain_ready(Instant::now()),
                    Err(RecvTimeoutError::Disconnected) => {
                        for event in debouncer.drain_all() {
                            let _ = async_tx.blocking_send(event);
                        }
                        return;
                    }
                };

                for event in ready {
                    if async_tx.blocking_send(event).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Coalesces bursts of events per path. Editors emit several events per
/// save; only the last one is forwarded, once the path has been quiet for
/// [`DEBOUNCE`].
#[derive(Debug, Default)]
struct Debouncer {
    pending: HashMap<PathBuf, (Instant, WatchEvent)>,
}

impl Debouncer {
    fn push(&mut self, event: WatchEvent, now: Instant) {
        self.pending.insert(event.path().to_path_buf(), (now, event));
    }

    /// Take the events whose path has been quiet long enough, oldest first.
    fn drain_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        let mut ready: Vec<(Instant, PathBuf)> = self
            .pending
            .iter()
            .filter(|(_, (at, _))| now.saturating_duration_since(*at) >= DEBOUNCE)
            .map(|(path, (at, _))| (*at, path.clone()))
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|(_, path)| self.pending.remove(&path).map(|(_, event)| event))
            .collect()
    }

    fn drain_all(&mut self) -> Vec<WatchEvent> {
        let mut events: Vec<(Instant, WatchEvent)> =
            self.pending.drain().map(|(_, pending)| pending).collect();
        events.sort_by_key(|(at, _)| *at);
        events.into_iter().map(|(_, event)| event).collect()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &EventKind) -> Option<WatchEvent> {
    match kind {
        EventKind::Remove(_) => Some(WatchEvent::Removed(path.to_path_buf())),
        EventKind::Create(_) | EventKind::Modify(_) => {
            // Renames report both the old and the new path as modifications.
            if path.exists() {
                Some(WatchEvent::Changed(path.to_path_buf()))
            } else {
                Some(WatchEvent::Removed(path.to_path_buf()))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        vec!["md".to_string(), "mdx".to_string()]
    }

    #[test]
    fn classifies_events() {
        let temp = tempdir().unwrap();
        let existing = temp.path().join("a.mdx");
        fs::write(&existing, "").unwrap();
        let gone = temp.path().join("gone.mdx");

        assert_eq!(
            classify_event(&existing, &EventKind::Modify(notify::event::ModifyKind::Any)),
            Some(WatchEvent::Changed(existing.clone()))
        );
        assert_eq!(
            classify_event(&gone, &EventKind::Modify(notify::event::ModifyKind::Any)),
            Some(WatchEvent::Removed(gone.clone()))
        );
        assert_eq!(
            classify_event(&gone, &EventKind::Remove(notify::event::RemoveKind::File)),
            Some(WatchEvent::Removed(gone))
        );
        assert_eq!(
            classify_event(&existing, &EventKind::Access(notify::event::AccessKind::Any)),
            None
        );
    }

    #[test]
    fn filters_by_extension() {
        assert!(has_extension(Path::new("docs/a.MDX"), &extensions()));
        assert!(!has_extension(Path::new("docs/a.txt"), &extensions()));
        assert!(!has_extension(Path::new("docs/README"), &extensions()));
    }

    #[test]
    fn forwards_the_last_event_of_a_burst() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let page = PathBuf::from("docs/page.mdx");
        let mut debouncer = Debouncer::default();

        debouncer.push(WatchEvent::Removed(page.clone()), start);
        debouncer.push(WatchEvent::Changed(page.clone()), start + ms(10));
        assert!(debouncer.drain_ready(start + ms(60)).is_empty());

        debouncer.push(WatchEvent::Changed(page.clone()), start + ms(80));
        assert!(debouncer.drain_ready(start + ms(150)).is_empty());

        assert_eq!(
            debouncer.drain_ready(start + ms(180)),
            vec![WatchEvent::Changed(page)]
        );
        assert!(debouncer.pending.is_empty());
    }

    #[test]
    fn debounces_paths_independently() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let a = PathBuf::from("a.mdx");
        let b = PathBuf::from("b.mdx");
        let mut debouncer = Debouncer::default();

        debouncer.push(WatchEvent::Changed(a.clone()), start);
        debouncer.push(WatchEvent::Removed(b.clone()), start + ms(50));

        assert_eq!(
            debouncer.drain_ready(start + ms(120)),
            vec![WatchEvent::Changed(a)]
        );
        assert_eq!(debouncer.drain_all(), vec![WatchEvent::Removed(b)]);
        assert!(debouncer.drain_ready(start + ms(500)).is_empty());
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("test.mdx");

        // Create the watcher first (so it catches file creation)
        let (watcher, mut rx) =
            FileWatcher::new(&[temp.path().to_path_buf()], extensions()).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "# Created").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        let event = event
            .expect("timeout waiting for file watch event")
            .expect("channel should not be closed");
        assert_eq!(event.path().file_name(), test_file.file_name());
    }
}

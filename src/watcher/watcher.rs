//! File system watcher using notify-rs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::events::FileEvent;
use crate::error::WatcherError;
use crate::Result;

/// Per-directory change notifications.
///
/// Directories are registered one at a time and non-recursively; the walker
/// registers every directory it enters. Registration is safe from any number
/// of threads and re-registering a directory is a no-op.
pub struct FileWatcher {
    inner: Mutex<RecommendedWatcher>,
    watched: Mutex<HashSet<PathBuf>>,
}

impl FileWatcher {
    /// Create a new file watcher and the channel its events arrive on.
    ///
    /// The channel closes once the watcher is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification backend cannot be started.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<FileEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let inner = notify::recommended_watcher(
            move |result: std::result::Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    for file_event in FileEvent::from_notify(&event) {
                        if event_tx.send(file_event).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Watch error");
                }
            },
        )
        .map_err(|e| WatcherError::Init(e.to_string()))?;

        let watcher = Self {
            inner: Mutex::new(inner),
            watched: Mutex::new(HashSet::new()),
        };

        Ok((watcher, event_rx))
    }

    /// Register `dir` for change notifications.
    ///
    /// Returns `false` if the directory was already registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be watched.
    pub fn watch(&self, dir: &Path) -> Result<bool> {
        let mut watched = self.watched.lock();
        if watched.contains(dir) {
            return Ok(false);
        }

        self.inner
            .lock()
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;

        watched.insert(dir.to_path_buf());
        tracing::trace!(path = %dir.display(), "Watching directory");

        Ok(true)
    }

    /// Stop watching `dir` and every registered directory below it.
    ///
    /// Directories that are already gone are dropped from the registration
    /// set all the same. Returns how many registrations were removed.
    pub fn unwatch(&self, dir: &Path) -> usize {
        let mut watched = self.watched.lock();
        let gone: Vec<PathBuf> = watched
            .iter()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect();

        let mut inner = self.inner.lock();
        for path in &gone {
            if let Err(e) = inner.unwatch(path) {
                tracing::trace!(path = %path.display(), error = %e, "Unwatch failed");
            }
            watched.remove(path);
        }

        if !gone.is_empty() {
            tracing::debug!(path = %dir.display(), count = gone.len(), "Stopped watching directories");
        }
        gone.len()
    }

    /// Check whether `dir` is registered.
    #[must_use]
    pub fn is_watching(&self, dir: &Path) -> bool {
        self.watched.lock().contains(dir)
    }

    /// Get the registered directories, sorted.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.watched.lock().iter().cloned().collect();
        dirs.sort();
        dirs
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched", &self.watched.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_watcher_nonexistent_dir() {
        let (watcher, _rx) = FileWatcher::new().unwrap();

        let result = watcher.watch(Path::new("/nonexistent/directory"));
        assert!(result.is_err());
        assert!(watcher.watched_dirs().is_empty());
    }

    #[test]
    fn test_watch_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let (watcher, _rx) = FileWatcher::new().unwrap();

        assert!(watcher.watch(tmp.path()).unwrap());
        assert!(!watcher.watch(tmp.path()).unwrap());
        assert_eq!(watcher.watched_dirs(), vec![tmp.path().to_path_buf()]);
    }

    #[test]
    fn test_unwatch_removes_descendants() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("artist/album");
        let other = tmp.path().join("other");
        fs::create_dir_all(&album).unwrap();
        fs::create_dir_all(&other).unwrap();

        let (watcher, _rx) = FileWatcher::new().unwrap();
        watcher.watch(&tmp.path().join("artist")).unwrap();
        watcher.watch(&album).unwrap();
        watcher.watch(&other).unwrap();

        assert_eq!(watcher.unwatch(&tmp.path().join("artist")), 2);
        assert!(!watcher.is_watching(&album));
        assert!(watcher.is_watching(&other));
    }

    #[test]
    fn test_unwatch_sibling_prefix() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let ab = tmp.path().join("ab");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&ab).unwrap();

        let (watcher, _rx) = FileWatcher::new().unwrap();
        watcher.watch(&a).unwrap();
        watcher.watch(&ab).unwrap();

        // Component-wise prefix: "ab" is not below "a".
        assert_eq!(watcher.unwatch(&a), 1);
        assert!(watcher.is_watching(&ab));
    }

    #[tokio::test]
    async fn test_events_arrive() {
        let tmp = TempDir::new().unwrap();
        let (watcher, mut rx) = FileWatcher::new().unwrap();
        watcher.watch(tmp.path()).unwrap();

        let song = tmp.path().join("song.mp3");
        fs::write(&song, b"").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(event) if event.path == song => break Some(event),
                    Some(_) => {}
                    None => break None,
                }
            }
        })
        .await
        .unwrap()
        .unwrap();

        assert!(event.is_upsert());
    }
}

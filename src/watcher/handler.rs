//! File change event handler.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::mpsc;

use super::events::{EventBatch, FileEvent};
use super::filter::FormatFilter;
use super::walker::PathWalker;
use super::watcher::FileWatcher;
use crate::storage::Catalog;

/// Statistics for file watching.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub events_received: AtomicU64,
    pub files_indexed: AtomicU64,
    pub files_filtered: AtomicU64,
    pub files_removed: AtomicU64,
    pub dirs_added: AtomicU64,
    pub errors: AtomicU64,
}

impl WatcherStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            files_indexed: self.files_indexed.load(Ordering::Relaxed),
            files_filtered: self.files_filtered.load(Ordering::Relaxed),
            files_removed: self.files_removed.load(Ordering::Relaxed),
            dirs_added: self.dirs_added.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WatcherStatsSnapshot {
    pub events_received: u64,
    pub files_indexed: u64,
    pub files_filtered: u64,
    pub files_removed: u64,
    pub dirs_added: u64,
    pub errors: u64,
}

/// Applies watcher events to the catalog.
///
/// Holds the watcher weakly: once its owner drops the watcher, the event
/// channel closes and [`EventHandler::run`] returns.
#[derive(Debug, Clone)]
pub struct EventHandler {
    catalog: Catalog,
    watcher: Weak<FileWatcher>,
    stats: Arc<WatcherStats>,
}

impl EventHandler {
    /// Create a new event handler.
    #[must_use]
    pub fn new(catalog: Catalog, watcher: &Arc<FileWatcher>, stats: Arc<WatcherStats>) -> Self {
        Self {
            catalog,
            watcher: Arc::downgrade(watcher),
            stats,
        }
    }

    /// Consume events until the channel closes.
    ///
    /// Events that queue up while a batch is being applied are coalesced
    /// into the next batch.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<FileEvent>) {
        while let Some(first) = events.recv().await {
            let mut batch = EventBatch::new();
            batch.add(first);
            while let Ok(event) = events.try_recv() {
                batch.add(event);
            }

            let handler = self.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || handler.process_batch(batch)).await
            {
                tracing::error!(error = %e, "Event batch task failed");
                WatcherStats::add(&self.stats.errors, 1);
            }
        }

        tracing::debug!("Watcher event channel closed");
    }

    /// Apply a batch of file events. Blocks the calling thread.
    pub fn process_batch(&self, batch: EventBatch) {
        WatcherStats::add(&self.stats.events_received, batch.len() as u64);

        for path in &batch.upserts {
            if path.is_dir() {
                self.index_directory(path);
            } else if FormatFilter::is_supported(path) {
                match self.catalog.upsert(path) {
                    Ok(_) => WatcherStats::add(&self.stats.files_indexed, 1),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to index changed file");
                        WatcherStats::add(&self.stats.errors, 1);
                    }
                }
            } else {
                WatcherStats::add(&self.stats.files_filtered, 1);
            }
        }

        for path in &batch.removals {
            self.remove(path);
        }

        let snapshot = self.stats.snapshot();
        tracing::debug!(
            received = snapshot.events_received,
            indexed = snapshot.files_indexed,
            removed = snapshot.files_removed,
            filtered = snapshot.files_filtered,
            "Processed event batch"
        );
    }

    /// Get current stats.
    #[must_use]
    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }

    /// A directory appeared: register it and everything below, then index it.
    fn index_directory(&self, dir: &Path) {
        let mut walker = PathWalker::new(dir, self.catalog.clone());
        if let Some(watcher) = self.watcher.upgrade() {
            walker = walker.with_watcher(watcher);
        }

        let report = walker.run();
        WatcherStats::add(&self.stats.dirs_added, 1);
        WatcherStats::add(
            &self.stats.files_indexed,
            report.stats.tracks_added + report.stats.tracks_updated,
        );
        WatcherStats::add(&self.stats.errors, report.stats.errors());
    }

    /// A path vanished. The path no longer exists, so the extension decides
    /// whether it was a track or a directory.
    fn remove(&self, path: &Path) {
        let result = if FormatFilter::is_supported(path) {
            self.catalog.remove(path).map(u64::from)
        } else {
            if let Some(watcher) = self.watcher.upgrade() {
                watcher.unwatch(path);
            }
            self.catalog.remove_under(path).map(|n| n as u64)
        };

        match result {
            Ok(n) => WatcherStats::add(&self.stats.files_removed, n),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove tracks");
                WatcherStats::add(&self.stats.errors, 1);
            }
        }
    }
}

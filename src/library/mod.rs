//! The local library: scan orchestration plus the catalog's query surface.
//!
//! A [`LocalLibrary`] owns everything a scan touches. Scans are
//! single-flighted through a generation barrier: a caller waits for the
//! running generation to finish (walk and cleanup) and then runs a fresh one.
//! Callers are queued, never rejected or merged.

mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use parking_lot::Mutex;
use tracing::Instrument;

use crate::config::{Config, ScanConfig};
use crate::error::MetadataError;
use crate::metadata::{MetadataExtractor, TagExtractor};
use crate::observability::spans::{scan_span, walker_span};
use crate::storage::{
    album_tracks, browse_albums, browse_artists, count_rows, get_album, get_artist, get_track,
    init_storage, prune_catalog, search_tracks, track_path, truncate, AlbumRecord,
    ArtistRecord, BrowseArgs, BrowsePage, Catalog, CatalogCounts, CleanupStats, Database,
    SearchOptions, SearchResult, TrackRecord, UpsertOutcome,
};
use crate::watcher::{
    EventHandler, FileWatcher, FormatFilter, PathWalker, Throttle, WalkReport, WatcherStats,
    WatcherStatsSnapshot,
};
use crate::{Error, Result};

pub use report::ScanReport;

/// A music library rooted in one or more local directories.
pub struct LocalLibrary {
    roots: Vec<PathBuf>,
    scan_config: ScanConfig,
    fast_scan: bool,
    catalog: Catalog,
    watch_enabled: bool,
    watcher: Mutex<Option<Arc<FileWatcher>>>,
    watcher_stats: Arc<WatcherStats>,
    generation: tokio::sync::Mutex<u64>,
}

impl LocalLibrary {
    /// Open the catalog under `config.data_dir` and read tags with
    /// [`TagExtractor`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let db = Database::open(config.database_path())?;
        init_storage(&db)?;
        let extractor: Arc<dyn MetadataExtractor> = Arc::new(TagExtractor::new());
        Ok(Self::new(Catalog::new(db, extractor), config))
    }

    /// Build a library over an existing catalog.
    #[must_use]
    pub fn new(catalog: Catalog, config: &Config) -> Self {
        Self {
            roots: config.roots.clone(),
            scan_config: config.scan,
            fast_scan: config.fast_scan,
            catalog,
            watch_enabled: true,
            watcher: Mutex::new(None),
            watcher_stats: WatcherStats::new(),
            generation: tokio::sync::Mutex::new(0),
        }
    }

    /// Enable or disable change notifications (enabled by default).
    #[must_use]
    pub const fn watching(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// The configured roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The underlying catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Refresh the whole catalog from disk.
    ///
    /// Waits for any running scan, then walks every root in parallel and
    /// prunes tracks whose files are gone along with dangling albums and
    /// artists. Never fails: per-file problems are
    /// logged and counted in the report.
    pub async fn scan(&self) -> ScanReport {
        let mut epoch = self.generation.lock().await;
        *epoch += 1;
        let generation = *epoch;

        self.run_generation(generation)
            .instrument(scan_span(generation))
            .await
    }

    async fn run_generation(&self, generation: u64) -> ScanReport {
        let started = Instant::now();
        tracing::info!(roots = self.roots.len(), "Library scan started");

        let watcher = self.ensure_watcher();

        if !self.fast_scan && !self.scan_config.initial_wait.is_zero() {
            tracing::debug!(wait = ?self.scan_config.initial_wait, "Waiting before scan");
            tokio::time::sleep(self.scan_config.initial_wait).await;
        }

        let walkers = self.roots.iter().map(|root| {
            let mut walker = PathWalker::new(root, self.catalog.clone())
                .with_throttle(Throttle::new(&self.scan_config, self.fast_scan));
            if let Some(watcher) = &watcher {
                walker = walker.with_watcher(Arc::clone(watcher));
            }

            let root = root.clone();
            let span = walker_span(&root);
            async move {
                match tokio::task::spawn_blocking(move || span.in_scope(|| walker.run())).await {
                    Ok(report) => report,
                    Err(e) => {
                        let err = Error::internal(format!("walker task failed: {e}"));
                        tracing::error!(root = %root.display(), error = %err, "Walker aborted");
                        WalkReport::aborted(root)
                    }
                }
            }
        });
        let roots = join_all(walkers).await;

        let catalog = self.catalog.clone();
        let cleanup = tokio::task::spawn_blocking(move || run_cleanup(&catalog))
            .await
            .unwrap_or_else(|e| {
                let err = Error::internal(format!("cleanup task failed: {e}"));
                tracing::error!(error = %err, "Cleanup aborted");
                CleanupStats::default()
            });

        let report = ScanReport {
            generation,
            roots,
            cleanup,
            elapsed: started.elapsed(),
        };

        let totals = report.totals();
        tracing::info!(
            media_files = totals.media_files,
            added = totals.tracks_added,
            updated = totals.tracks_updated,
            errors = totals.errors(),
            tracks_removed = report.cleanup.tracks_removed,
            albums_removed = report.cleanup.albums_removed,
            artists_removed = report.cleanup.artists_removed,
            elapsed = ?report.elapsed,
            "Library scan finished"
        );

        report
    }

    /// Create the watcher and its event handler on first use.
    ///
    /// A watcher that fails to start is logged and retried on the next scan;
    /// the scan itself goes ahead without change notifications.
    fn ensure_watcher(&self) -> Option<Arc<FileWatcher>> {
        if !self.watch_enabled {
            return None;
        }

        let mut slot = self.watcher.lock();
        if let Some(watcher) = slot.as_ref() {
            return Some(Arc::clone(watcher));
        }

        match FileWatcher::new() {
            Ok((watcher, events)) => {
                let watcher = Arc::new(watcher);
                let handler = EventHandler::new(
                    self.catalog.clone(),
                    &watcher,
                    Arc::clone(&self.watcher_stats),
                );
                tokio::spawn(handler.run(events));
                tracing::info!("File watcher started");

                *slot = Some(Arc::clone(&watcher));
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to start file watcher");
                None
            }
        }
    }

    /// Drop tracks whose files are gone, then albums and artists that no
    /// track references.
    ///
    /// Failures are logged and reported as an empty pass.
    pub fn cleanup(&self) -> CleanupStats {
        run_cleanup(&self.catalog)
    }

    /// Index one file outside of a scan.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Unsupported`] for files without a supported
    /// audio extension, or any error from reading or storing the track.
    pub fn add_media(&self, path: &Path) -> Result<UpsertOutcome> {
        if !FormatFilter::is_supported(path) {
            return Err(MetadataError::Unsupported(path.display().to_string()).into());
        }
        self.catalog.upsert(path)
    }

    /// Find tracks by title, album or artist.
    ///
    /// Query failures are logged and yield no results.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_with(query, &SearchOptions::default())
            .unwrap_or_else(|e| {
                tracing::error!(query, error = %e, "Search failed");
                Vec::new()
            })
    }

    /// Find tracks by title, album or artist, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        self.catalog
            .db()
            .with_conn(|conn| search_tracks(conn, query, options))
    }

    /// One page of albums.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn browse_albums(&self, args: &BrowseArgs) -> Result<BrowsePage<AlbumRecord>> {
        self.catalog.db().with_conn(|conn| browse_albums(conn, args))
    }

    /// One page of artists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn browse_artists(&self, args: &BrowseArgs) -> Result<BrowsePage<ArtistRecord>> {
        self.catalog.db().with_conn(|conn| browse_artists(conn, args))
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no such track exists.
    pub fn get_track(&self, id: i64) -> Result<TrackRecord> {
        self.catalog.db().with_conn(|conn| get_track(conn, id))
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no such album exists.
    pub fn get_album(&self, id: i64) -> Result<AlbumRecord> {
        self.catalog.db().with_conn(|conn| get_album(conn, id))
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no such artist exists.
    pub fn get_artist(&self, id: i64) -> Result<ArtistRecord> {
        self.catalog.db().with_conn(|conn| get_artist(conn, id))
    }

    /// Tracks of one album, ordered by track number.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn album_tracks(&self, album_id: i64) -> Result<Vec<SearchResult>> {
        self.catalog
            .db()
            .with_conn(|conn| album_tracks(conn, album_id))
    }

    /// Filesystem path of a track.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such track exists.
    pub fn track_path(&self, id: i64) -> Result<PathBuf> {
        self.catalog
            .db()
            .with_conn(|conn| track_path(conn, id))
            .map(PathBuf::from)
    }

    /// Number of tracks, albums and artists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn counts(&self) -> Result<CatalogCounts> {
        self.catalog.db().with_conn(count_rows)
    }

    /// Empty the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete fails.
    pub fn truncate(&self) -> Result<()> {
        self.catalog.db().with_transaction(truncate)
    }

    /// Live change statistics.
    #[must_use]
    pub fn watcher_stats(&self) -> WatcherStatsSnapshot {
        self.watcher_stats.snapshot()
    }

    /// Directories currently registered for change notifications.
    #[must_use]
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.watcher
            .lock()
            .as_ref()
            .map(|w| w.watched_dirs())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for LocalLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLibrary")
            .field("roots", &self.roots)
            .field("scan_config", &self.scan_config)
            .field("fast_scan", &self.fast_scan)
            .field("watch_enabled", &self.watch_enabled)
            .finish_non_exhaustive()
    }
}

fn run_cleanup(catalog: &Catalog) -> CleanupStats {
    match prune_catalog(catalog.db()) {
        Ok(stats) => {
            if !stats.is_empty() {
                tracing::info!(
                    tracks = stats.tracks_removed,
                    albums = stats.albums_removed,
                    artists = stats.artists_removed,
                    "Pruned catalog"
                );
            }
            stats
        }
        Err(e) => {
            tracing::error!(error = %e, "Catalog cleanup failed");
            CleanupStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FilenameExtractor;
    use std::fs;
    use tempfile::TempDir;

    fn library(root: &Path) -> LocalLibrary {
        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        let config = Config {
            roots: vec![root.to_path_buf()],
            fast_scan: true,
            ..Config::default()
        };
        LocalLibrary::new(Catalog::new(db, Arc::new(FilenameExtractor::new())), &config)
            .watching(false)
    }

    #[tokio::test]
    async fn test_scan_numbers_generations() {
        let tmp = TempDir::new().unwrap();
        let lib = library(tmp.path());

        assert_eq!(lib.scan().await.generation, 1);
        assert_eq!(lib.scan().await.generation, 2);
    }

    #[tokio::test]
    async fn test_missing_root_degrades_only_itself() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("song.mp3"), b"").unwrap();

        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        let config = Config {
            roots: vec![PathBuf::from("/nonexistent/root"), tmp.path().to_path_buf()],
            fast_scan: true,
            ..Config::default()
        };
        let lib = LocalLibrary::new(Catalog::new(db, Arc::new(FilenameExtractor::new())), &config)
            .watching(false);

        let report = lib.scan().await;
        assert_eq!(report.roots[0].stats.io_errors, 1);
        assert_eq!(report.roots[1].stats.tracks_added, 1);
        assert_eq!(lib.counts().unwrap().tracks, 1);
    }

    #[test]
    fn test_add_media_rejects_unsupported() {
        let tmp = TempDir::new().unwrap();
        let notes = tmp.path().join("notes.txt");
        fs::write(&notes, b"").unwrap();

        let lib = library(tmp.path());
        let err = lib.add_media(&notes).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Metadata(MetadataError::Unsupported(_))
        ));
    }

    #[test]
    fn test_cleanup_on_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        assert!(library(tmp.path()).cleanup().is_empty());
    }
}

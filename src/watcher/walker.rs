//! Recursive traversal of one library root.
//!
//! [`MediaWalk`] turns a root into a lazy sequence of [`Discovery`] values.
//! [`PathWalker`] consumes that sequence: media files go to the catalog,
//! directories go to the watcher, and everything that goes wrong is counted
//! in [`WalkStats`] instead of stopping the walk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use walkdir::WalkDir;

use super::filter::FormatFilter;
use super::watcher::FileWatcher;
use crate::config::{ser_duration, ScanConfig};
use crate::storage::{normalize_path, Catalog};
use crate::Error;

/// One entry found below a root.
#[derive(Debug)]
pub enum Discovery {
    /// A directory, the root included.
    Directory(PathBuf),
    /// A regular file with a supported audio extension.
    MediaFile(PathBuf),
    /// Anything else.
    Ignored(PathBuf),
    /// An entry that could not be read.
    Failed(walkdir::Error),
}

/// Depth-first discovery of everything below a root.
///
/// Symlinks are followed; loops are reported as [`Discovery::Failed`].
/// Each call to [`MediaWalk::iter`] starts a fresh traversal.
#[derive(Debug, Clone)]
pub struct MediaWalk {
    root: PathBuf,
}

impl MediaWalk {
    /// Create a walk over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a traversal. Entries within a directory come in file name order.
    #[must_use]
    pub fn iter(&self) -> Discoveries {
        Discoveries {
            inner: WalkDir::new(&self.root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
        }
    }
}

/// Iterator returned by [`MediaWalk::iter`].
pub struct Discoveries {
    inner: walkdir::IntoIter,
}

impl Iterator for Discoveries {
    type Item = Discovery;

    fn next(&mut self) -> Option<Discovery> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Discovery::Failed(e)),
        };

        let file_type = entry.file_type();
        let path = entry.into_path();
        Some(if file_type.is_dir() {
            Discovery::Directory(path)
        } else if file_type.is_file() && FormatFilter::is_supported(&path) {
            Discovery::MediaFile(path)
        } else {
            Discovery::Ignored(path)
        })
    }
}

/// Pauses a walker after every N walked entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    every: u64,
    pause: Duration,
    processed: u64,
}

impl Throttle {
    /// Build a throttle from scan settings. Fast mode disables it.
    #[must_use]
    pub const fn new(config: &ScanConfig, fast: bool) -> Self {
        if fast {
            return Self::disabled();
        }
        Self {
            every: config.files_per_operation,
            pause: config.sleep_per_operation,
            processed: 0,
        }
    }

    /// A throttle that never pauses.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            every: 0,
            pause: Duration::ZERO,
            processed: 0,
        }
    }

    /// True when this throttle will ever pause.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.every > 0 && !self.pause.is_zero()
    }

    /// Count one walked entry: a directory, media file or ignored file.
    ///
    /// Returns the pause to take when the count reaches the limit, and
    /// starts counting again from zero.
    pub fn tick(&mut self) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }

        self.processed += 1;
        if self.processed >= self.every {
            self.processed = 0;
            Some(self.pause)
        } else {
            None
        }
    }
}

/// Counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub directories: u64,
    pub media_files: u64,
    pub tracks_added: u64,
    pub tracks_updated: u64,
    pub ignored: u64,
    pub io_errors: u64,
    pub metadata_errors: u64,
    pub storage_errors: u64,
    pub dirs_watched: u64,
    pub watch_errors: u64,
    pub pauses: u64,
}

impl WalkStats {
    /// Add another walk's counters to these.
    pub fn merge(&mut self, other: &Self) {
        self.directories += other.directories;
        self.media_files += other.media_files;
        self.tracks_added += other.tracks_added;
        self.tracks_updated += other.tracks_updated;
        self.ignored += other.ignored;
        self.io_errors += other.io_errors;
        self.metadata_errors += other.metadata_errors;
        self.storage_errors += other.storage_errors;
        self.dirs_watched += other.dirs_watched;
        self.watch_errors += other.watch_errors;
        self.pauses += other.pauses;
    }

    /// Total per-entry failures of any kind.
    #[must_use]
    pub const fn errors(&self) -> u64 {
        self.io_errors + self.metadata_errors + self.storage_errors + self.watch_errors
    }
}

/// Outcome of walking one root.
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    pub root: PathBuf,
    pub stats: WalkStats,
    /// False when the walker task died before finishing.
    pub completed: bool,
    #[serde(serialize_with = "ser_duration")]
    pub elapsed: Duration,
}

impl WalkReport {
    /// Report for a walker that never returned.
    #[must_use]
    pub fn aborted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stats: WalkStats::default(),
            completed: false,
            elapsed: Duration::ZERO,
        }
    }
}

/// Walks one root into the catalog.
#[derive(Debug)]
pub struct PathWalker {
    root: PathBuf,
    catalog: Catalog,
    watcher: Option<Arc<FileWatcher>>,
    throttle: Throttle,
}

impl PathWalker {
    /// Create an unthrottled walker that registers no directories.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, catalog: Catalog) -> Self {
        Self {
            root: normalize_path(root.as_ref()),
            catalog,
            watcher: None,
            throttle: Throttle::disabled(),
        }
    }

    /// Register every directory entered with `watcher`.
    #[must_use]
    pub fn with_watcher(mut self, watcher: Arc<FileWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Pause according to `throttle`.
    #[must_use]
    pub const fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    /// Walk the root to completion. Blocks the calling thread.
    pub fn run(mut self) -> WalkReport {
        let started = Instant::now();
        let mut stats = WalkStats::default();

        tracing::info!(root = %self.root.display(), "Walking library root");

        for discovery in MediaWalk::new(&self.root).iter() {
            match discovery {
                Discovery::Directory(dir) => {
                    stats.directories += 1;
                    self.register(&dir, &mut stats);
                }
                Discovery::MediaFile(path) => {
                    stats.media_files += 1;
                    self.index(&path, &mut stats);
                }
                Discovery::Ignored(_) => stats.ignored += 1,
                Discovery::Failed(e) => {
                    tracing::warn!(error = %e, "Error walking directory");
                    stats.io_errors += 1;
                    continue;
                }
            }

            if let Some(pause) = self.throttle.tick() {
                tracing::trace!(pause = ?pause, "Throttling walker");
                std::thread::sleep(pause);
                stats.pauses += 1;
            }
        }

        let elapsed = started.elapsed();
        tracing::info!(
            root = %self.root.display(),
            media_files = stats.media_files,
            added = stats.tracks_added,
            updated = stats.tracks_updated,
            errors = stats.errors(),
            elapsed = ?elapsed,
            "Walk complete"
        );

        WalkReport {
            root: self.root,
            stats,
            completed: true,
            elapsed,
        }
    }

    fn register(&self, dir: &Path, stats: &mut WalkStats) {
        let Some(watcher) = &self.watcher else {
            return;
        };

        match watcher.watch(dir) {
            Ok(true) => stats.dirs_watched += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to watch directory");
                stats.watch_errors += 1;
            }
        }
    }

    fn index(&self, path: &Path, stats: &mut WalkStats) {
        match self.catalog.upsert(path) {
            Ok(outcome) if outcome.created => stats.tracks_added += 1,
            Ok(_) => stats.tracks_updated += 1,
            Err(Error::Metadata(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                stats.metadata_errors += 1;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to store track");
                stats.storage_errors += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FilenameExtractor;
    use crate::storage::{count_rows, init_storage, Database};
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> Catalog {
        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        Catalog::new(db, Arc::new(FilenameExtractor::new()))
    }

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_media_walk_classifies() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/01 - One.mp3");
        touch(tmp.path(), "a/cover.jpg");
        touch(tmp.path(), "b/02 - Two.FLAC");

        let mut dirs = 0;
        let mut media = Vec::new();
        let mut ignored = 0;
        for discovery in MediaWalk::new(tmp.path()).iter() {
            match discovery {
                Discovery::Directory(_) => dirs += 1,
                Discovery::MediaFile(p) => media.push(p.file_name().unwrap().to_owned()),
                Discovery::Ignored(_) => ignored += 1,
                Discovery::Failed(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(dirs, 3);
        assert_eq!(media, vec!["01 - One.mp3", "02 - Two.FLAC"]);
        assert_eq!(ignored, 1);
    }

    #[test]
    fn test_media_walk_is_restartable() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "x.mp3");

        let walk = MediaWalk::new(tmp.path());
        assert_eq!(walk.iter().count(), 2);
        assert_eq!(walk.iter().count(), 2);
    }

    #[test]
    fn test_media_walk_missing_root() {
        let walk = MediaWalk::new("/nonexistent/library/root");
        let items: Vec<_> = walk.iter().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Discovery::Failed(_)));
    }

    #[test]
    fn test_throttle_pauses_every_n() {
        let config = ScanConfig {
            files_per_operation: 2,
            sleep_per_operation: Duration::from_millis(5),
            ..ScanConfig::default()
        };
        let mut throttle = Throttle::new(&config, false);

        assert_eq!(throttle.tick(), None);
        assert_eq!(throttle.tick(), Some(Duration::from_millis(5)));
        assert_eq!(throttle.tick(), None);
        assert_eq!(throttle.tick(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_throttle_disabled() {
        let config = ScanConfig {
            files_per_operation: 1,
            sleep_per_operation: Duration::from_millis(5),
            ..ScanConfig::default()
        };
        assert!(!Throttle::new(&config, true).is_enabled());

        let zero_count = ScanConfig {
            files_per_operation: 0,
            ..config
        };
        assert!(!Throttle::new(&zero_count, false).is_enabled());

        let zero_sleep = ScanConfig {
            sleep_per_operation: Duration::ZERO,
            ..config
        };
        let mut throttle = Throttle::new(&zero_sleep, false);
        assert_eq!(throttle.tick(), None);
    }

    #[test]
    fn test_walker_indexes_and_counts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Album/01 - Artist - One.mp3");
        touch(tmp.path(), "Album/02 - Artist - Two.ogg");
        touch(tmp.path(), "Album/notes.txt");

        let catalog = catalog();
        let report = PathWalker::new(tmp.path(), catalog.clone()).run();

        assert!(report.completed);
        assert_eq!(report.stats.media_files, 2);
        assert_eq!(report.stats.tracks_added, 2);
        assert_eq!(report.stats.ignored, 1);
        assert_eq!(report.stats.errors(), 0);

        let counts = catalog.db().with_conn(count_rows).unwrap();
        assert_eq!((counts.tracks, counts.albums, counts.artists), (2, 1, 1));

        let again = PathWalker::new(tmp.path(), catalog).run();
        assert_eq!(again.stats.tracks_added, 0);
        assert_eq!(again.stats.tracks_updated, 2);
    }

    #[test]
    fn test_walker_throttles_on_every_entry() {
        let tmp = TempDir::new().unwrap();
        for i in 0..9 {
            touch(tmp.path(), &format!("cover{i}.jpg"));
        }

        let config = ScanConfig {
            files_per_operation: 5,
            sleep_per_operation: Duration::from_millis(1),
            ..ScanConfig::default()
        };
        let report = PathWalker::new(tmp.path(), catalog())
            .with_throttle(Throttle::new(&config, false))
            .run();

        // Ten entries: the root and nine ignored files.
        assert_eq!(report.stats.ignored, 9);
        assert_eq!(report.stats.media_files, 0);
        assert_eq!(report.stats.pauses, 2);
    }

    #[test]
    fn test_walker_throttle_skips_failed_entries() {
        let config = ScanConfig {
            files_per_operation: 1,
            sleep_per_operation: Duration::from_millis(1),
            ..ScanConfig::default()
        };
        let report = PathWalker::new("/nonexistent/library/root", catalog())
            .with_throttle(Throttle::new(&config, false))
            .run();

        assert_eq!(report.stats.io_errors, 1);
        assert_eq!(report.stats.pauses, 0);
    }

    #[test]
    fn test_walker_counts_metadata_errors() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "good.mp3");
        touch(tmp.path(), "bad.mp3");

        let db = Database::open_in_memory().unwrap();
        init_storage(&db).unwrap();
        let fallback = FilenameExtractor::new();
        let extractor = move |path: &Path| {
            if path.ends_with("bad.mp3") {
                Err(crate::error::MetadataError::unreadable(path, "corrupt").into())
            } else {
                crate::metadata::MetadataExtractor::extract(&fallback, path)
            }
        };
        let catalog = Catalog::new(db, Arc::new(extractor));

        let report = PathWalker::new(tmp.path(), catalog).run();
        assert_eq!(report.stats.tracks_added, 1);
        assert_eq!(report.stats.metadata_errors, 1);
    }

    #[test]
    fn test_walker_registers_directories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/b/song.mp3");

        let (watcher, _rx) = FileWatcher::new().unwrap();
        let watcher = Arc::new(watcher);
        let report = PathWalker::new(tmp.path(), catalog())
            .with_watcher(Arc::clone(&watcher))
            .run();

        assert_eq!(report.stats.dirs_watched, 3);
        assert!(watcher.is_watching(&tmp.path().join("a/b")));
    }

    #[test]
    fn test_walk_stats_merge() {
        let mut total = WalkStats {
            media_files: 2,
            io_errors: 1,
            ..WalkStats::default()
        };
        total.merge(&WalkStats {
            media_files: 3,
            storage_errors: 1,
            ..WalkStats::default()
        });
        assert_eq!(total.media_files, 5);
        assert_eq!(total.errors(), 2);
    }
}

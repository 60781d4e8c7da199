//! Scan outcome reporting.

use std::time::Duration;

use serde::Serialize;

use crate::config::ser_duration;
use crate::storage::CleanupStats;
use crate::watcher::{WalkReport, WalkStats};

/// What one scan generation did.
///
/// Purely observational: a scan always succeeds, and per-file failures only
/// show up here and in the logs.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Generation number, starting at 1 for the first scan of a library.
    pub generation: u64,
    /// One report per configured root, in configuration order.
    pub roots: Vec<WalkReport>,
    /// Rows pruned after the walk.
    pub cleanup: CleanupStats,
    #[serde(serialize_with = "ser_duration")]
    pub elapsed: Duration,
}

impl ScanReport {
    /// Counters summed over every root.
    #[must_use]
    pub fn totals(&self) -> WalkStats {
        let mut totals = WalkStats::default();
        for root in &self.roots {
            totals.merge(&root.stats);
        }
        totals
    }

    /// True when every walker ran to completion.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.roots.iter().all(|r| r.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn walk(root: &str, media_files: u64) -> WalkReport {
        WalkReport {
            root: PathBuf::from(root),
            stats: WalkStats {
                media_files,
                tracks_added: media_files,
                ..WalkStats::default()
            },
            completed: true,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_totals() {
        let report = ScanReport {
            generation: 1,
            roots: vec![walk("/a", 2), walk("/b", 3)],
            cleanup: CleanupStats::default(),
            elapsed: Duration::from_millis(20),
        };

        let totals = report.totals();
        assert_eq!(totals.media_files, 5);
        assert_eq!(totals.tracks_added, 5);
        assert!(report.all_completed());
    }

    #[test]
    fn test_aborted_root() {
        let report = ScanReport {
            generation: 2,
            roots: vec![walk("/a", 1), WalkReport::aborted("/b")],
            cleanup: CleanupStats::default(),
            elapsed: Duration::ZERO,
        };
        assert!(!report.all_completed());
        assert_eq!(report.totals().media_files, 1);
    }

    #[test]
    fn test_serializes_elapsed_as_text() {
        let report = ScanReport {
            generation: 3,
            roots: Vec::new(),
            cleanup: CleanupStats::default(),
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], "1s 500ms");
        assert_eq!(json["generation"], 3);
    }
}

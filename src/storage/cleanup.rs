//! Post-scan pruning of missing tracks and dangling albums and artists.

use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use super::connection::Database;
use crate::error::StorageError;
use crate::Result;

/// Rows removed by one cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub tracks_removed: u64,
    pub albums_removed: u64,
    pub artists_removed: u64,
}

impl CleanupStats {
    /// True when nothing was removed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tracks_removed == 0 && self.albums_removed == 0 && self.artists_removed == 0
    }
}

/// Full cleanup pass: drop tracks whose files are gone, then albums and
/// artists that no track references any more.
///
/// Files are checked without holding the database lock. A file whose
/// existence cannot be determined (permission denied, I/O error) is kept.
///
/// # Errors
///
/// Returns an error if a query or delete fails.
pub fn prune_catalog(db: &Database) -> Result<CleanupStats> {
    let tracks = db.with_conn(track_paths)?;

    let missing: Vec<(i64, String)> = tracks
        .into_iter()
        .filter(|(_, fs_path)| matches!(Path::new(fs_path).try_exists(), Ok(false)))
        .collect();

    if !missing.is_empty() {
        tracing::debug!(count = missing.len(), "Tracks with missing files");
    }

    db.with_transaction(|conn| {
        let tracks_removed = remove_tracks(conn, &missing)?;
        let dangling = remove_dangling(conn)?;
        Ok(CleanupStats {
            tracks_removed,
            ..dangling
        })
    })
}

/// Id and path of every track.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn track_paths(conn: &Connection) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn
        .prepare("SELECT id, fs_path FROM tracks ORDER BY id")
        .map_err(|e| StorageError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| StorageError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("failed to read track paths: {e}")))?;

    Ok(rows)
}

/// Delete the given tracks.
///
/// Both id and path must still match, so a row that was re-pointed since the
/// paths were read is left alone.
fn remove_tracks(conn: &Connection, tracks: &[(i64, String)]) -> Result<u64> {
    let mut stmt = conn
        .prepare("DELETE FROM tracks WHERE id = ?1 AND fs_path = ?2")
        .map_err(|e| StorageError::Database(e.to_string()))?;

    let mut removed = 0;
    for (id, fs_path) in tracks {
        removed += stmt
            .execute(params![id, fs_path])
            .map_err(|e| StorageError::Database(format!("failed to remove track: {e}")))?
            as u64;
    }
    Ok(removed)
}

/// Delete albums, then artists, that no track references.
///
/// Artists are counted by direct track references only: an artist whose
/// album still has tracks by someone else is dangling all the same.
/// Must run inside a transaction.
///
/// # Errors
///
/// Returns an error if either delete fails.
pub fn remove_dangling(conn: &Connection) -> Result<CleanupStats> {
    let albums = conn
        .execute(
            "DELETE FROM albums
             WHERE NOT EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = albums.id)",
            [],
        )
        .map_err(|e| StorageError::Database(format!("failed to prune albums: {e}")))?;

    let artists = conn
        .execute(
            "DELETE FROM artists
             WHERE NOT EXISTS (SELECT 1 FROM tracks t WHERE t.artist_id = artists.id)",
            [],
        )
        .map_err(|e| StorageError::Database(format!("failed to prune artists: {e}")))?;

    Ok(CleanupStats {
        tracks_removed: 0,
        albums_removed: albums as u64,
        artists_removed: artists as u64,
    })
}

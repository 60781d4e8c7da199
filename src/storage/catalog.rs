//! Track/album/artist writes.
//!
//! All writes are keyed on natural unique keys (track path, album
//! directory, artist name) and run inside one immediate transaction, so
//! concurrent walkers and watcher events never create duplicate rows and no
//! reader ever sees a track pointing at a missing album or artist.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};

use super::connection::Database;
use crate::error::StorageError;
use crate::metadata::{MetadataExtractor, TrackMetadata};
use crate::Result;

/// Result of a successful upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Id of the inserted or updated track.
    pub track_id: i64,
    /// True when the track row did not exist before.
    pub created: bool,
}

/// The relational catalog: a database plus the extractor that feeds it.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
    extractor: Arc<dyn MetadataExtractor>,
}

impl Catalog {
    /// Create a catalog over an initialised database.
    #[must_use]
    pub fn new(db: Database, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { db, extractor }
    }

    /// The underlying database.
    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    /// Read metadata for `path` and store it.
    ///
    /// Metadata extraction happens before the database lock is taken.
    ///
    /// # Errors
    ///
    /// Returns a metadata error if extraction fails (nothing is written), or
    /// a storage error if the write fails (the transaction is rolled back).
    pub fn upsert(&self, path: &Path) -> Result<UpsertOutcome> {
        let path = normalize_path(path);
        let meta = self.extractor.extract(&path)?;
        let outcome = self
            .db
            .with_transaction(|conn| persist_track(conn, &path, &meta))?;

        tracing::debug!(
            path = %path.display(),
            track_id = outcome.track_id,
            created = outcome.created,
            "Upserted track"
        );
        Ok(outcome)
    }

    /// Delete the track stored under `path`.
    ///
    /// Its album and artist are left for the cleanup pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path);
        let removed = self
            .db
            .with_conn(|conn| delete_track_by_path(conn, &path_key(&path)))?;

        if removed {
            tracing::debug!(path = %path.display(), "Removed track");
        }
        Ok(removed)
    }

    /// Delete every track stored below directory `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove_under(&self, dir: &Path) -> Result<usize> {
        let dir = normalize_path(dir);
        let mut prefix = path_key(&dir);
        if !prefix.ends_with(MAIN_SEPARATOR) {
            prefix.push(MAIN_SEPARATOR);
        }

        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM tracks WHERE substr(fs_path, 1, length(?1)) = ?1",
                [&prefix],
            )
            .map_err(|e| StorageError::Database(format!("failed to remove tracks: {e}")).into())
        })?;

        if removed > 0 {
            tracing::debug!(dir = %dir.display(), count = removed, "Removed tracks under directory");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

/// Write one track, creating its album and artist when unseen.
///
/// Must run inside a transaction.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn persist_track(conn: &Connection, path: &Path, meta: &TrackMetadata) -> Result<UpsertOutcome> {
    let fs_path = path_key(path);
    let album_dir = path.parent().map(path_key).unwrap_or_default();

    let artist_id = ensure_artist(conn, &meta.artist)?;
    let album_id = ensure_album(conn, &meta.album, &album_dir)?;

    let existing: Option<i64> = conn
        .query_row("SELECT id FROM tracks WHERE fs_path = ?", [&fs_path], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| StorageError::Database(format!("failed to look up track: {e}")))?;

    let duration_ms = i64::try_from(meta.duration.as_millis()).unwrap_or(i64::MAX);

    conn.execute(
        "INSERT INTO tracks (name, album_id, artist_id, number, fs_path, duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(fs_path) DO UPDATE SET
            name = excluded.name,
            album_id = excluded.album_id,
            artist_id = excluded.artist_id,
            number = excluded.number,
            duration = excluded.duration",
        params![
            meta.title,
            album_id,
            artist_id,
            meta.track_number,
            fs_path,
            duration_ms
        ],
    )
    .map_err(|e| StorageError::Database(format!("failed to upsert track: {e}")))?;

    let track_id = match existing {
        Some(id) => id,
        None => conn.last_insert_rowid(),
    };

    Ok(UpsertOutcome {
        track_id,
        created: existing.is_none(),
    })
}

fn ensure_artist(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO artists (name) VALUES (?) ON CONFLICT(name) DO NOTHING",
        [name],
    )
    .map_err(|e| StorageError::Database(format!("failed to insert artist: {e}")))?;

    conn.query_row("SELECT id FROM artists WHERE name = ?", [name], |row| {
        row.get(0)
    })
    .map_err(|e| StorageError::Database(format!("failed to look up artist: {e}")).into())
}

fn ensure_album(conn: &Connection, name: &str, fs_path: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO albums (name, fs_path) VALUES (?, ?) ON CONFLICT(fs_path) DO NOTHING",
        [name, fs_path],
    )
    .map_err(|e| StorageError::Database(format!("failed to insert album: {e}")))?;

    conn.query_row("SELECT id FROM albums WHERE fs_path = ?", [fs_path], |row| {
        row.get(0)
    })
    .map_err(|e| StorageError::Database(format!("failed to look up album: {e}")).into())
}

fn delete_track_by_path(conn: &Connection, fs_path: &str) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM tracks WHERE fs_path = ?", [fs_path])
        .map_err(|e| StorageError::Database(format!("failed to delete track: {e}")))?;
    Ok(deleted > 0)
}

/// Make `path` absolute and lexically clean (no `.` or `..` components).
///
/// Symlinks are not resolved, so a path reported by a removal event maps to
/// the same key it was stored under.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

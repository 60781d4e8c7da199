//! Database schema definitions and migrations.
//!
//! Provides versioned schema migrations for safe database upgrades.

use rusqlite::Connection;

use crate::error::StorageError;
use crate::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const TABLES: [&str; 3] = ["artists", "albums", "tracks"];

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| StorageError::Migration(format!("failed to create migrations table: {e}")))?;

    let current_version = get_current_version(conn)?;
    tracing::debug!(
        current = current_version,
        target = SCHEMA_VERSION,
        "Checking database migrations"
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::Migration(format!("failed to get version: {e}")).into())
}

fn record_migration(conn: &Connection, version: i32) -> Result<()> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let now_i64 = i64::try_from(now).unwrap_or_default();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
        rusqlite::params![version, now_i64],
    )
    .map_err(|e| StorageError::Migration(format!("failed to record migration: {e}")))?;

    Ok(())
}

/// Migration v1: artists, albums and tracks.
fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Applying migration v1: library catalog");

    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS artists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        -- fs_path is the directory holding the album's tracks
        CREATE TABLE IF NOT EXISTS albums (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            fs_path TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_albums_name ON albums(name);

        -- duration is stored in milliseconds
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            album_id INTEGER NOT NULL REFERENCES albums(id) ON DELETE RESTRICT,
            artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE RESTRICT,
            number INTEGER NOT NULL DEFAULT 0,
            fs_path TEXT NOT NULL UNIQUE,
            duration INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_tracks_album_id ON tracks(album_id);
        CREATE INDEX IF NOT EXISTS idx_tracks_artist_id ON tracks(artist_id);
        ",
    )
    .map_err(|e| StorageError::Migration(format!("v1 migration failed: {e}")))?;

    record_migration(conn, 1)?;
    tracing::info!("Migration v1 complete");

    Ok(())
}

/// Verify all expected tables exist.
///
/// # Errors
///
/// Returns an error if any expected table is missing from the schema.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    for table in TABLES {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
                [table],
                |_| Ok(true),
            )
            .unwrap_or(false);

        if !exists {
            return Err(StorageError::Migration(format!("table '{table}' not found")).into());
        }
    }

    tracing::debug!("Schema verification passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn migrated() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(migrate).unwrap();
        db
    }

    #[test]
    fn test_migrate_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            migrate(conn)?;
            migrate(conn)?;
            verify_schema(conn)?;
            assert_eq!(get_current_version(conn)?, SCHEMA_VERSION);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_verify_schema_missing_table() {
        let db = Database::open_in_memory().unwrap();
        let err = db.with_conn(verify_schema).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_track_requires_existing_album_and_artist() {
        let db = migrated();
        db.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO tracks (name, album_id, artist_id, number, fs_path, duration)
                 VALUES ('Orphan', 99, 99, 1, '/x/orphan.mp3', 0)",
                [],
            );
            assert!(result.is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_unique_track_path() {
        let db = migrated();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO artists (name) VALUES ('A');
                 INSERT INTO albums (name, fs_path) VALUES ('B', '/b');
                 INSERT INTO tracks (name, album_id, artist_id, fs_path) VALUES ('t', 1, 1, '/b/t.mp3');",
            )
            .unwrap();

            let dup = conn.execute(
                "INSERT INTO tracks (name, album_id, artist_id, fs_path) VALUES ('t2', 1, 1, '/b/t.mp3')",
                [],
            );
            assert!(dup.is_err());

            let dup_artist = conn.execute("INSERT INTO artists (name) VALUES ('A')", []);
            assert!(dup_artist.is_err());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_album_with_tracks_cannot_be_deleted() {
        let db = migrated();
        db.with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO artists (name) VALUES ('A');
                 INSERT INTO albums (name, fs_path) VALUES ('B', '/b');
                 INSERT INTO tracks (name, album_id, artist_id, fs_path) VALUES ('t', 1, 1, '/b/t.mp3');",
            )
            .unwrap();

            assert!(conn.execute("DELETE FROM albums WHERE id = 1", []).is_err());
            Ok(())
        })
        .unwrap();
    }
}

//! Read operations used by browse and list-by-id collaborators.

use rusqlite::{params, Connection, Row};

use super::models::{
    AlbumRecord, ArtistRecord, BrowseArgs, BrowsePage, CatalogCounts, SearchResult, TrackRecord,
};
use crate::error::StorageError;
use crate::Result;

/// Columns selected for a [`SearchResult`], in `map_search_result` order.
pub(crate) const RESULT_COLUMNS: &str = "t.id, t.name, al.name, t.album_id, ar.name, t.artist_id, \
     t.number, t.duration";

/// Joins for a [`SearchResult`] query.
pub(crate) const RESULT_JOINS: &str = "FROM tracks t
     JOIN albums al ON al.id = t.album_id
     JOIN artists ar ON ar.id = t.artist_id";

pub(crate) fn map_search_result(row: &Row<'_>) -> rusqlite::Result<SearchResult> {
    let duration: i64 = row.get(7)?;
    Ok(SearchResult {
        id: row.get(0)?,
        title: row.get(1)?,
        album: row.get(2)?,
        album_id: row.get(3)?,
        artist: row.get(4)?,
        artist_id: row.get(5)?,
        track_number: row.get(6)?,
        duration_ms: u64::try_from(duration).unwrap_or_default(),
    })
}

fn not_found_or(entity: &'static str, id: i64) -> impl FnOnce(rusqlite::Error) -> crate::Error {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => StorageError::not_found(entity, id.to_string()).into(),
        e => StorageError::Database(format!("failed to get {entity}: {e}")).into(),
    }
}

/// Get a track by id.
///
/// # Errors
///
/// Returns `NotFound` if no such track exists.
pub fn get_track(conn: &Connection, id: i64) -> Result<TrackRecord> {
    conn.query_row(
        "SELECT id, name, album_id, artist_id, number, fs_path, duration FROM tracks WHERE id = ?",
        [id],
        |row| {
            let duration: i64 = row.get(6)?;
            Ok(TrackRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                album_id: row.get(2)?,
                artist_id: row.get(3)?,
                number: row.get(4)?,
                fs_path: row.get(5)?,
                duration_ms: u64::try_from(duration).unwrap_or_default(),
            })
        },
    )
    .map_err(not_found_or("track", id))
}

/// Get an album by id.
///
/// # Errors
///
/// Returns `NotFound` if no such album exists.
pub fn get_album(conn: &Connection, id: i64) -> Result<AlbumRecord> {
    conn.query_row(
        "SELECT id, name, fs_path FROM albums WHERE id = ?",
        [id],
        |row| {
            Ok(AlbumRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                fs_path: row.get(2)?,
            })
        },
    )
    .map_err(not_found_or("album", id))
}

/// Get an artist by id.
///
/// # Errors
///
/// Returns `NotFound` if no such artist exists.
pub fn get_artist(conn: &Connection, id: i64) -> Result<ArtistRecord> {
    conn.query_row("SELECT id, name FROM artists WHERE id = ?", [id], |row| {
        Ok(ArtistRecord {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })
    .map_err(not_found_or("artist", id))
}

/// Tracks of one album, ordered by track number.
///
/// # Errors
///
/// Returns an error if the query fails. An unknown album yields an empty list.
pub fn album_tracks(conn: &Connection, album_id: i64) -> Result<Vec<SearchResult>> {
    let sql = format!(
        "SELECT {RESULT_COLUMNS} {RESULT_JOINS} WHERE t.album_id = ? ORDER BY t.number, t.id"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(e.to_string()))?;

    let rows = stmt
        .query_map([album_id], map_search_result)
        .map_err(|e| StorageError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(e.to_string()))?;

    Ok(rows)
}

/// Filesystem path of a track, for the file-serving layer.
///
/// # Errors
///
/// Returns `NotFound` if no such track exists.
pub fn track_path(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row("SELECT fs_path FROM tracks WHERE id = ?", [id], |row| {
        row.get(0)
    })
    .map_err(not_found_or("track", id))
}

/// One page of albums.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn browse_albums(conn: &Connection, args: &BrowseArgs) -> Result<BrowsePage<AlbumRecord>> {
    let sql = format!(
        "SELECT id, name, fs_path FROM albums ORDER BY {} LIMIT ? OFFSET ?",
        args.order_clause()
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(e.to_string()))?;

    let items = stmt
        .query_map(params![args.limit(), args.offset()], |row| {
            Ok(AlbumRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                fs_path: row.get(2)?,
            })
        })
        .map_err(|e| StorageError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(e.to_string()))?;

    Ok(BrowsePage {
        items,
        total: count_table(conn, "albums")?,
    })
}

/// One page of artists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn browse_artists(conn: &Connection, args: &BrowseArgs) -> Result<BrowsePage<ArtistRecord>> {
    let sql = format!(
        "SELECT id, name FROM artists ORDER BY {} LIMIT ? OFFSET ?",
        args.order_clause()
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(e.to_string()))?;

    let items = stmt
        .query_map(params![args.limit(), args.offset()], |row| {
            Ok(ArtistRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(|e| StorageError::Database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(e.to_string()))?;

    Ok(BrowsePage {
        items,
        total: count_table(conn, "artists")?,
    })
}

/// Row counts of all catalog tables.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_rows(conn: &Connection) -> Result<CatalogCounts> {
    Ok(CatalogCounts {
        tracks: count_table(conn, "tracks")?,
        albums: count_table(conn, "albums")?,
        artists: count_table(conn, "artists")?,
    })
}

fn count_table(conn: &Connection, table: &'static str) -> Result<u64> {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .map_err(|e| StorageError::Database(e.to_string()))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Delete every track, album and artist.
///
/// # Errors
///
/// Returns an error if a delete fails.
pub fn truncate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM tracks;
         DELETE FROM albums;
         DELETE FROM artists;",
    )
    .map_err(|e| StorageError::Database(format!("failed to truncate catalog: {e}")))?;

    tracing::info!("Catalog truncated");
    Ok(())
}

//! `SQLite` catalog of tracks, albums and artists.
//!
//! This module provides:
//! - Connection management and schema migrations
//! - Conflict-aware track upserts and removals ([`Catalog`])
//! - The post-scan cleanup of missing tracks and dangling albums and artists
//! - Browse, list-by-id and search queries

mod browse;
mod catalog;
mod cleanup;
mod connection;
mod models;
mod schema;
mod search;

pub use browse::{
    album_tracks, browse_albums, browse_artists, count_rows, get_album, get_artist, get_track,
    track_path, truncate,
};
pub use catalog::{normalize_path, persist_track, Catalog, UpsertOutcome};
pub use cleanup::{prune_catalog, remove_dangling, track_paths, CleanupStats};
pub use connection::Database;
pub use models::{
    AlbumRecord, ArtistRecord, BrowseArgs, BrowseOrder, BrowsePage, CatalogCounts, SearchResult,
    SortDirection, TrackRecord,
};
pub use schema::{migrate, verify_schema, SCHEMA_VERSION};
pub use search::{search_tracks, SearchOptions};

/// Initialize storage with migrations.
///
/// # Errors
///
/// Returns an error if database initialization fails.
pub fn init_storage(db: &Database) -> crate::Result<()> {
    db.with_conn(|conn| {
        migrate(conn)?;
        verify_schema(conn)?;

        tracing::info!("Storage initialized, schema version {SCHEMA_VERSION}");
        Ok(())
    })
}

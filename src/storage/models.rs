//! Data models for catalog rows and query results.

use serde::{Deserialize, Serialize};

/// A row of the `tracks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Database primary key.
    pub id: i64,
    /// Track title.
    pub title: String,
    /// Owning album.
    pub album_id: i64,
    /// Performing artist.
    pub artist_id: i64,
    /// Position on the album, zero when unknown.
    pub number: u32,
    /// Normalised path of the audio file.
    pub fs_path: String,
    /// Playing time in milliseconds.
    pub duration_ms: u64,
}

/// A row of the `albums` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    /// Database primary key.
    pub id: i64,
    /// Album name as first seen.
    pub name: String,
    /// Directory the album's tracks live in.
    pub fs_path: String,
}

/// A row of the `artists` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Database primary key.
    pub id: i64,
    /// Artist name.
    pub name: String,
}

/// A track joined with its album and artist names.
///
/// Returned by search and by album listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Track id.
    pub id: i64,
    /// Track title.
    pub title: String,
    /// Album name.
    pub album: String,
    /// Album id.
    pub album_id: i64,
    /// Artist name.
    pub artist: String,
    /// Artist id.
    pub artist_id: i64,
    /// Position on the album.
    pub track_number: u32,
    /// Playing time in milliseconds.
    pub duration_ms: u64,
}

/// Row counts of the three catalog tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub tracks: u64,
    pub albums: u64,
    pub artists: u64,
}

/// Column to order browse pages by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowseOrder {
    #[default]
    Name,
    Id,
}

/// Sort direction for browse pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Paging arguments for album and artist listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseArgs {
    /// One-based page number. Zero is treated as one.
    pub page: u32,
    /// Rows per page. Zero is treated as one.
    pub per_page: u32,
    pub order: BrowseOrder,
    pub direction: SortDirection,
}

impl Default for BrowseArgs {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            order: BrowseOrder::Name,
            direction: SortDirection::Asc,
        }
    }
}

impl BrowseArgs {
    /// Row offset of the first item on the page. Saturates at `i64::MAX`.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1).saturating_mul(self.limit())
    }

    /// Rows per page, at least one.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.max(1))
    }

    pub(crate) const fn order_clause(&self) -> &'static str {
        match (self.order, self.direction) {
            (BrowseOrder::Name, SortDirection::Asc) => "name ASC, id ASC",
            (BrowseOrder::Name, SortDirection::Desc) => "name DESC, id DESC",
            (BrowseOrder::Id, SortDirection::Asc) => "id ASC",
            (BrowseOrder::Id, SortDirection::Desc) => "id DESC",
        }
    }
}

/// One page of a listing plus the total number of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowsePage<T> {
    pub items: Vec<T>,
    pub total: u64,
}
